pub mod m202510010001_create_plagiarism_submissions;
pub mod m202510010002_create_plagiarism_webhooks;
