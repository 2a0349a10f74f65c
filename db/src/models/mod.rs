pub mod plagiarism_submission;
pub mod plagiarism_webhook;

pub use plagiarism_submission::Entity as PlagiarismSubmission;
pub use plagiarism_webhook::Entity as PlagiarismWebhook;
