mod common;

mod dispatch_tests;
mod resolver_tests;
