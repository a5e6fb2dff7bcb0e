mod fixtures;
mod plan_tests;
