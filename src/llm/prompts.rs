//! Prompt templates for resume analysis.

pub const COMPARE_PREAMBLE: &str = "\
You are an experienced HR specialist and technical recruiter. \
You evaluate how well a candidate's resume fits a job posting. \
Be concrete, honest and concise. Answer in the language of the job posting.";

pub const QUESTION_PREAMBLE: &str = "\
You are a career assistant. You answer the candidate's questions using their resume \
and, when available, the job posting they are applying to. \
If the answer is not supported by the resume, say so. \
Answer in the language of the question.";

/// Build the comparison prompt.
pub fn compare_prompt(resume_text: &str, job_text: &str) -> String {
    format!(
        "Resume:\n{resume_text}\n\n\
         Job posting:\n{job_text}\n\n\
         Tasks:\n\
         1. List the matching skills and experience.\n\
         2. List the missing skills.\n\
         3. Estimate the probability of a successful application, in percent.\n\
         4. Write a short cover letter based on the resume and the job posting.\n\n\
         Answer in a structured way, keeping the four sections separate."
    )
}

/// Build the question-answering prompt. `job_text` may be empty.
pub fn question_prompt(resume_text: &str, job_text: &str, question: &str) -> String {
    let job_section = if job_text.trim().is_empty() {
        "Job posting: (none provided)".to_string()
    } else {
        format!("Job posting:\n{job_text}")
    };
    format!("Resume:\n{resume_text}\n\n{job_section}\n\nQuestion:\n{question}")
}
