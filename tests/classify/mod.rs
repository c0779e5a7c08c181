mod custom_test;
mod pipeline_test;
