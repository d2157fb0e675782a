mod rate_limiter_tests;
mod token_manager_tests;
