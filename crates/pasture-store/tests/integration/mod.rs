mod common;
mod pipeline_tests;
mod scheduler_tests;
