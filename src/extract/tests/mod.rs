mod assets_tests;
mod meta_tests;
