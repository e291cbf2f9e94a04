//! User-visible message texts.

pub const HELP: &str = "Send me your resume as a PDF or DOCX file, then a link to a job posting. \
I'll compare them and write a short cover letter. You can also ask questions about your resume \
as plain text.";

pub const UNSUPPORTED_FORMAT: &str = "⚠️ Only PDF and DOCX files are supported.";
pub const QUEUE_FULL: &str = "⏳ Too many requests right now. Please try again in a few minutes.";
pub const SHUTTING_DOWN: &str = "⏳ The assistant is restarting. Please try again shortly.";
pub const TRY_LATER: &str = "❌ Something went wrong. Please try again later.";

pub const DOCUMENT_ACCEPTED: &str = "📄 File received, processing...";
pub const POSTING_ACCEPTED: &str = "🔗 Link received, fetching the job posting...";
pub const QUESTION_ACCEPTED: &str = "🔍 Thinking about your question... this may take a minute.";

pub const EXTRACTING: &str = "📄 Extracting text from your resume...";
pub const RESUME_SAVED: &str = "✅ Resume processed and saved.";
pub const RESUME_EMPTY: &str = "❌ Could not extract text from the resume.";
pub const DOWNLOAD_FAILED: &str = "❌ Could not download the file. Please send it again.";

pub const POSTING_SAVED_NO_RESUME: &str =
    "✅ Job posting saved. Send your resume to get a comparison.";
pub const POSTING_UNSUPPORTED_DOMAIN: &str =
    "⚠️ This job site is not supported yet. Try an hh.ru vacancy link.";
pub const POSTING_FETCH_FAILED: &str =
    "❌ Could not load the job posting. Please check the link or try later.";
pub const POSTING_EMPTY: &str = "❌ The job posting page has no readable description.";
pub const ANALYSIS_FAILED: &str =
    "❌ Job posting saved, but the analysis failed. Please try again later.";
pub const ANALYSIS_HEADER: &str = "📊 Analysis results:";

pub const UPLOAD_RESUME_FIRST: &str = "⚠️ Resume not found. Please upload your resume first.";
pub const NO_POSTING_CAVEAT: &str =
    "ℹ️ No job posting saved yet, so this answer is based on your resume only.";
pub const ANSWER_FAILED: &str = "❌ Could not answer right now. Please try again later.";
