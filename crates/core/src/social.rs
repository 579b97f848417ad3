//! Social-share copy for job posts.
//!
//! Operators post this text by hand, so it has to fit the tightest target
//! network. The description is the only part that gets shortened.

use crate::entity::{CountryCode, JobPostDetails};

/// Upper bound on the formatted text, in characters.
pub const SOCIAL_POST_MAX_CHARS: usize = 500;

const ELLIPSIS: char = '…';

/// Truncate `s` to at most `max` characters, ending in `…` when shortened.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push(ELLIPSIS);
    out
}

/// Hashtags appended to every share, e.g. `#jobs #hiring #mwjobs`.
pub fn hashtags(country: Option<&CountryCode>) -> String {
    match country {
        Some(cc) => format!("#jobs #hiring #{}jobs", cc.as_str().to_ascii_lowercase()),
        None => "#jobs #hiring".to_string(),
    }
}

/// Build the shareable text for a job post.
///
/// Layout:
///
/// ```text
/// {title}
///
/// {description, truncated}
///
/// Salary: {salary}        (only if present)
/// Apply: {short_url}
///
/// {hashtags}
/// ```
pub fn format_job_post(
    details: &JobPostDetails,
    country: Option<&CountryCode>,
    short_url: &str,
) -> String {
    let title = truncate_chars(details.title.trim(), 120);
    let mut footer = String::new();
    if let Some(salary) = details.salary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        footer.push_str(&format!("Salary: {}\n", truncate_chars(salary, 60)));
    }
    footer.push_str(&format!("Apply: {short_url}\n\n{}", hashtags(country)));

    // title + "\n\n" + description + "\n\n" + footer
    let fixed = title.chars().count() + footer.chars().count() + 4;
    let room = SOCIAL_POST_MAX_CHARS.saturating_sub(fixed);
    let description = truncate_chars(details.description.trim(), room);

    let text = if description.is_empty() {
        format!("{title}\n\n{footer}")
    } else {
        format!("{title}\n\n{description}\n\n{footer}")
    };
    truncate_chars(&text, SOCIAL_POST_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(description: &str, salary: Option<&str>) -> JobPostDetails {
        JobPostDetails {
            post_id: 5,
            title: "Accountant".into(),
            description: description.into(),
            salary: salary.map(str::to_string),
            slug: None,
        }
    }

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let s = "ñandú ñandú";
        let out = truncate_chars(s, 6);
        assert_eq!(out.chars().count(), 6);
        assert!(out.ends_with(ELLIPSIS));
    }

    #[test]
    fn short_post_has_every_section() {
        let cc = CountryCode::parse("MW").unwrap();
        let text = format_job_post(
            &details("Keep the books.", Some("MWK 400,000")),
            Some(&cc),
            "https://s.example/abc123",
        );
        assert_eq!(
            text,
            "Accountant\n\nKeep the books.\n\nSalary: MWK 400,000\nApply: https://s.example/abc123\n\n#jobs #hiring #mwjobs"
        );
    }

    #[test]
    fn salary_line_omitted_when_blank() {
        let text = format_job_post(&details("x", Some("  ")), None, "u");
        assert!(!text.contains("Salary"));
        assert!(text.ends_with("#jobs #hiring"));
    }

    #[test]
    fn long_description_is_truncated_but_link_survives() {
        let long = "word ".repeat(400);
        let text = format_job_post(&details(&long, None), None, "https://s.example/abc123");
        assert!(text.chars().count() <= SOCIAL_POST_MAX_CHARS);
        assert!(text.contains("Apply: https://s.example/abc123"));
        assert!(text.contains(ELLIPSIS));
    }
}
