//! Envio de e-mails transacionais.
//!
//! O serviço de autenticação só conhece o trait `Mailer`. Em produção o
//! envio passa por uma API HTTP de e-mail (formato Resend); sem chave
//! configurada, os e-mails só aparecem no log.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;

pub const PASSWORD_RESET_SUBJECT: &str = "Código de redefinição de senha - E-Coleta";

/// Falhas de entrega. Nunca chegam ao cliente HTTP; só são logadas.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("falha de transporte: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provedor recusou o e-mail (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("falha ao renderizar template: {0}")]
    Template(#[from] askama::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), DeliveryError>;
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmail<'a> {
    name: &'a str,
    code: &'a str,
    expires_in_minutes: i64,
    unsubscribe_url: &'a str,
}

pub fn render_password_reset(
    name: &str,
    code: &str,
    expires_in_minutes: i64,
    unsubscribe_url: &str,
) -> Result<String, DeliveryError> {
    let html = PasswordResetEmail {
        name,
        code,
        expires_in_minutes,
        unsubscribe_url,
    }
    .render()?;
    Ok(html)
}

/// Entrega sem bloquear quem chamou. Erros de envio ficam só no log
/// e não há nova tentativa.
pub fn dispatch(
    mailer: Arc<dyn Mailer>,
    to: String,
    subject: &'static str,
    html_body: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match mailer.send(&to, subject, &html_body).await {
            Ok(()) => tracing::info!("📧 E-mail '{}' enviado para {}", subject, to),
            Err(e) => tracing::error!("🔥 Falha ao enviar e-mail para {}: {}", to, e),
        }
    })
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

// Cliente da API HTTP de e-mail
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        let payload = OutgoingEmail {
            from: &self.from,
            to: [to],
            subject,
            html: html_body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// Fallback de desenvolvimento: sem EMAIL_API_KEY, só registra no log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), DeliveryError> {
        tracing::info!("📭 (sem provedor de e-mail) '{}' para {}", subject, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_email_contains_code_expiry_and_unsubscribe_link() {
        let html =
            render_password_reset("Ana", "042917", 30, "https://ecoleta.com.br/descadastrar")
                .unwrap();

        assert!(html.contains("Olá, Ana!"));
        assert!(html.contains("042917"));
        assert!(html.contains("expira em 30 minutos"));
        assert!(html.contains("https://ecoleta.com.br/descadastrar"));
    }

    #[test]
    fn reset_email_escapes_user_supplied_name() {
        let html = render_password_reset("<script>", "000000", 30, "#").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn outgoing_payload_matches_provider_format() {
        let payload = OutgoingEmail {
            from: "E-Coleta <nao-responda@ecoleta.com.br>",
            to: ["ana@x.com"],
            subject: PASSWORD_RESET_SUBJECT,
            html: "<p>oi</p>",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["to"][0], "ana@x.com");
        assert_eq!(json["subject"], PASSWORD_RESET_SUBJECT);
        assert_eq!(json["html"], "<p>oi</p>");
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer.send("ana@x.com", "assunto", "<p></p>").await.is_ok());
    }
}
