mod fakes;
mod scheduler_tests;
