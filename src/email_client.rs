use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::{domain::{money::format_minor, user_email::UserEmail}, models::{Order, OrderItemModel}};

/// Client for a Postmark-compatible `/email` endpoint.
#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: UserEmail,
    authorization_token: SecretString,
}

// Payload expected by the email api
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

/// A rendered message, both as html and plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: UserEmail,
        authorization_token: SecretString,
        timeout_secs: u64,
    ) -> Result<EmailClient, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sender,
            authorization_token,
        })
    }

    #[tracing::instrument(
        "Sending email",
        skip(self, content),
        fields(subject = %content.subject)
    )]
    pub async fn send(&self, recipient: &UserEmail, content: &EmailContent) -> Result<(), reqwest::Error> {
        let body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            subject: &content.subject,
            html_body: &content.html,
            text_body: &content.text,
        };

        self.http_client
            .post(format!("{}/email", self.base_url))
            .header("X-Postmark-Server-Token", self.authorization_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

impl EmailContent {
    pub fn account_confirmation(link: &str) -> Self {
        Self {
            subject: "Confirm your account".to_string(),
            html: format!(
                "<p>Welcome! <a href=\"{}\">Click here</a> to confirm your account.</p>",
                escape_html(link)
            ),
            text: format!("Welcome! Click to confirm your account: {}", link),
        }
    }

    /// Receipt sent once an order is committed. Zero fees are left out.
    pub fn order_confirmation(order: &Order, items: &[OrderItemModel], currency: &str) -> Self {
        let money = |amount: i64| format_minor(amount, currency);

        let mut text = format!("Thank you for your order {}.\n\n", order.order_number);
        let mut rows = String::new();

        for item in items {
            let line_total = item.unit_price.saturating_mul(i64::from(item.quantity));
            text.push_str(&format!("{} x {} - {}\n", item.quantity, item.product_name, money(line_total)));
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                item.quantity,
                escape_html(&item.product_name),
                money(line_total)
            ));
        }

        let summary = [
            ("Subtotal", order.subtotal),
            ("Shipping", order.shipping_fee),
            ("Cash on delivery fee", order.cod_fee),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount != 0)
        .chain(std::iter::once(("Total", order.total)));

        text.push('\n');
        let mut html_summary = String::new();
        for (label, amount) in summary {
            text.push_str(&format!("{}: {}\n", label, money(amount)));
            html_summary.push_str(&format!("<p>{}: {}</p>", label, money(amount)));
        }

        let destination = format!("{}, {}, {}", order.shipping_name, order.shipping_address, order.shipping_city);
        text.push_str(&format!(
            "\nPayment method: {}\nShipping to: {}\n",
            order.payment_method, destination
        ));

        Self {
            subject: format!("Your order {} has been received", order.order_number),
            html: format!(
                "<h1>Thank you for your order {}</h1><table>{}</table>{}<p>Payment method: {}</p><p>Shipping to: {}</p>",
                order.order_number,
                rows,
                html_summary,
                order.payment_method,
                escape_html(&destination)
            ),
            text,
        }
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
