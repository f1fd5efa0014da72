//! Digest rendering: staged payload → email message.

use hireboard_directory::StagedDigest;

use crate::mailer::EmailMessage;

/// Render one staged digest into a deliverable message.
///
/// Plain text on purpose: layout/styling is out of scope for this system,
/// and the delivery collaborator accepts rendered content as-is.
pub fn render_digest(digest: &StagedDigest) -> EmailMessage {
    let count = digest.listings.len();
    let subject = if count == 1 {
        "1 new job listing for you".to_string()
    } else {
        format!("{count} new job listings for you")
    };

    let mut body = String::from("New listings matching your preferences:\n\n");
    for listing in &digest.listings {
        body.push_str(&format!("- {} at {}\n", listing.title, listing.org_name));
    }
    body.push_str("\nYou receive this digest because of your notification settings.\n");

    EmailMessage {
        to: digest.recipient_email.clone(),
        subject,
        body,
    }
}
