//! Hand-off message for the administrator's messaging app.
//!
//! Pure formatting: nothing is sent from here. The customer opens the link.

use serde::Serialize;
use url::Url;

use crate::models::credit_request::CreditRequest;

const HANDOFF_BASE: &str = "https://wa.me";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub message: String,
    pub handoff_url: String,
}

pub struct NotificationComposer {
    chat_url: Url,
}

impl NotificationComposer {
    pub fn new(admin_contact: &str) -> Result<Self, url::ParseError> {
        let digits: String = admin_contact.chars().filter(char::is_ascii_digit).collect();
        assert!(!digits.is_empty(), "Admin contact must contain digits");
        let chat_url = Url::parse(&format!("{HANDOFF_BASE}/{digits}"))?;
        Ok(Self { chat_url })
    }

    pub fn compose(&self, request: &CreditRequest) -> NotificationView {
        let message = summary(request);
        let mut url = self.chat_url.clone();
        url.query_pairs_mut().append_pair("text", &message);
        NotificationView {
            message,
            handoff_url: url.to_string(),
        }
    }
}

fn summary(request: &CreditRequest) -> String {
    let kind = if request.is_free_request {
        "Free request (first time)"
    } else {
        "Payment made"
    };
    format!(
        "*New credit request*\n\n\
         *Name:* {}\n\
         *Contact:* {}\n\
         *Link:* {}\n\
         *Credits:* {}\n\
         *Type:* {}\n\
         *Reference:* {}\n\n\
         Awaiting credit delivery. Thank you!",
        request.full_name,
        request.contact_handle,
        request.invite_link,
        request.credits_amount,
        kind,
        request.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credit_request::RequestStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn request(free: bool) -> CreditRequest {
        CreditRequest {
            id: Uuid::nil(),
            full_name: "João Silva".to_string(),
            contact_handle: "+244 923 456 789".to_string(),
            invite_link: "https://lovable.dev/invite/abc?x=1&y=2".to_string(),
            credits_amount: 20,
            payment_proof_url: None,
            is_free_request: free,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_names_request_type() {
        let composer = NotificationComposer::new("+244 927-800-658").unwrap();
        let free = composer.compose(&request(true));
        let paid = composer.compose(&request(false));

        assert!(free.message.contains("Free request (first time)"));
        assert!(paid.message.contains("Payment made"));
        assert!(free.message.contains("*Credits:* 20"));
        assert!(free.handoff_url.starts_with("https://wa.me/244927800658?text="));
    }

    #[test]
    fn handoff_text_is_query_encoded() {
        let composer = NotificationComposer::new("244900000000").unwrap();
        let view = composer.compose(&request(true));

        let query = view.handoff_url.split_once("?text=").unwrap().1;
        assert!(!query.contains(' '));
        assert!(!query.contains('&'));
        assert!(!query.contains('\n'));

        let parsed = Url::parse(&view.handoff_url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("text".to_string(), view.message.clone())]);
    }
}
