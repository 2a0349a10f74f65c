mod health_test;
mod plagiarism;
