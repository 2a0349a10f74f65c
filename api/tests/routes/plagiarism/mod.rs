mod submissions_test;
mod webhook_test;
