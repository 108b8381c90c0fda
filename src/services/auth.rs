// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use tokio::{sync::OnceCell, task::JoinHandle};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        clock::Clock,
        error::AppError,
        validation::{digits_only, normalize_email},
    },
    db::{Repositories, ResetCodeRepository, SessionRepository, UserRepository},
    models::auth::{
        Claims, NewUser, RegisterUserPayload, ResetPasswordPayload, Session, User,
    },
    services::notification::{self, Mailer, PASSWORD_RESET_SUBJECT},
};

pub const RESET_CODE_TTL_MINUTES: i64 = 30;
pub const MAX_RESET_ATTEMPTS: i32 = 5;

// Senha de referência para o hash usado quando o e-mail não existe
const DUMMY_PASSWORD: &str = "ecoleta-conta-inexistente";

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub bcrypt_cost: u32,
    pub unsubscribe_url: String,
}

// Resultado de um login: o token para o cliente e a sessão gravada
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    reset_codes: Arc<dyn ResetCodeRepository>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
    // Hash com o mesmo custo dos reais, gerado no primeiro login com e-mail desconhecido
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(
        repos: &Repositories,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users: repos.users.clone(),
            sessions: repos.sessions.clone(),
            reset_codes: repos.reset_codes.clone(),
            mailer,
            clock,
            settings,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub async fn register_user(&self, payload: RegisterUserPayload) -> Result<Uuid, AppError> {
        payload.validate()?;

        let email = normalize_email(&payload.email);
        let tax_id = digits_only(&payload.tax_id);

        // Checagem antecipada para uma resposta clara; corridas entre dois
        // cadastros simultâneos caem nas constraints únicas do banco.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }
        if self.users.find_by_tax_id(&tax_id).await?.is_some() {
            return Err(AppError::DuplicateTaxId);
        }

        let password_hash = self.hash_secret(payload.password).await?;

        let user = self
            .users
            .create(NewUser {
                name: payload.name.trim().to_string(),
                email,
                tax_id,
                phone: digits_only(&payload.phone),
                password_hash,
            })
            .await?;

        tracing::info!("👤 Usuário {} cadastrado.", user.id);
        Ok(user.id)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            // Mesmo custo de um login real: o tempo de resposta não revela se a conta existe
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| self.hash_secret(DUMMY_PASSWORD.to_owned()))
                .await?
                .clone();
            self.verify_secret(password.to_owned(), dummy).await?;
            return Err(AppError::InvalidCredentials);
        };

        if !self.verify_secret(password.to_owned(), user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            email: user.email.clone(),
            created_at: now,
            expires_at: now + self.settings.session_ttl,
        };
        self.sessions.create(&session).await?;

        let token = self.create_token(&session)?;
        Ok(IssuedSession {
            token,
            session,
            user,
        })
    }

    /// Busca sem efeitos colaterais. Token inválido, sessão apagada ou
    /// expirada resultam em `None`.
    pub async fn get_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let Some(claims) = self.decode_token(token) else {
            return Ok(None);
        };

        let session = match self.sessions.find(claims.sid).await? {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.user_id != claims.sub || session.is_expired(self.clock.now()) {
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Sessão válida + usuário dono dela, ou `Unauthorized`.
    pub async fn current_user(&self, token: &str) -> Result<(Session, User), AppError> {
        let session = self.get_session(token).await?.ok_or(AppError::Unauthorized)?;
        let user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok((session, user))
    }

    /// Idempotente: tokens desconhecidos ou já encerrados não geram erro.
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        if let Some(claims) = self.decode_token(token) {
            self.sessions.delete(claims.sid).await?;
            tracing::debug!("Sessão {} encerrada.", claims.sid);
        }
        Ok(())
    }

    /// Nunca falha para quem chamou, exista a conta ou não. Busca, hash,
    /// gravação e envio rodam numa task separada, então a resposta sai no
    /// mesmo tempo para e-mails cadastrados ou não.
    pub fn request_password_reset(&self, email: &str) -> JoinHandle<()> {
        let service = self.clone();
        let email = normalize_email(email);
        tokio::spawn(async move {
            if let Err(e) = service.issue_reset_code(&email).await {
                tracing::error!("🔥 Falha ao gerar código de redefinição: {}", e);
            }
        })
    }

    async fn issue_reset_code(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::debug!("Pedido de redefinição para e-mail não cadastrado.");
            return Ok(());
        };

        let code = generate_reset_code();
        let code_hash = self.hash_secret(code.clone()).await?;

        let now = self.clock.now();
        let expires_at = now + Duration::minutes(RESET_CODE_TTL_MINUTES);
        self.reset_codes
            .replace(user.id, &code_hash, now, expires_at)
            .await?;

        let html = notification::render_password_reset(
            &user.name,
            &code,
            RESET_CODE_TTL_MINUTES,
            &self.settings.unsubscribe_url,
        )
        .map_err(|e| anyhow::anyhow!("Falha ao renderizar e-mail: {}", e))?;

        notification::dispatch(self.mailer.clone(), user.email, PASSWORD_RESET_SUBJECT, html);
        Ok(())
    }

    pub async fn reset_password(&self, payload: ResetPasswordPayload) -> Result<(), AppError> {
        payload.validate()?;

        let user = self
            .users
            .find_by_email(&normalize_email(&payload.email))
            .await?
            .ok_or(AppError::InvalidOrExpiredCode)?;

        let reset = self
            .reset_codes
            .find_active(user.id)
            .await?
            .ok_or(AppError::InvalidOrExpiredCode)?;

        let now = self.clock.now();
        if now >= reset.expires_at || reset.failed_attempts >= MAX_RESET_ATTEMPTS {
            return Err(AppError::InvalidOrExpiredCode);
        }

        if !self.verify_secret(payload.code, reset.code_hash.clone()).await? {
            self.reset_codes.record_failure(reset.id).await?;
            return Err(AppError::InvalidOrExpiredCode);
        }

        // Uso único: se outro pedido consumiu primeiro, este perde.
        if !self.reset_codes.consume(reset.id, now).await? {
            return Err(AppError::InvalidOrExpiredCode);
        }

        let password_hash = self.hash_secret(payload.new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;

        let revoked = self.sessions.delete_for_user(user.id).await?;
        tracing::info!(
            "🔑 Senha redefinida para o usuário {} ({} sessões encerradas).",
            user.id,
            revoked
        );
        Ok(())
    }

    // bcrypt é caro: roda no pool de threads bloqueantes
    async fn hash_secret(&self, secret: String) -> Result<String, AppError> {
        let cost = self.settings.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash(&secret, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify_secret(&self, secret: String, hashed: String) -> Result<bool, AppError> {
        let is_valid = tokio::task::spawn_blocking(move || verify(&secret, &hashed))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(is_valid)
    }

    fn create_token(&self, session: &Session) -> Result<String, AppError> {
        let claims = Claims {
            sub: session.user_id,
            sid: session.id,
            exp: session.expires_at.timestamp() as usize,
            iat: session.created_at.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_ref()),
        )?)
    }

    // Só confere a assinatura. A validade vem da linha em `sessions`,
    // comparada com o relógio injetado.
    fn decode_token(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .ok()
    }
}

/// Seis dígitos, com zeros à esquerda.
fn generate_reset_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        common::clock::SystemClock,
        services::notification::LogMailer,
    };

    fn service() -> AuthService {
        AuthService::new(
            &Repositories::in_memory(Arc::new(SystemClock)),
            Arc::new(LogMailer),
            Arc::new(SystemClock),
            AuthSettings {
                jwt_secret: "segredo".into(),
                session_ttl: Duration::hours(1),
                bcrypt_cost: 4,
                unsubscribe_url: "#".into(),
            },
        )
    }

    #[tokio::test]
    async fn unknown_email_still_pays_for_a_bcrypt_verify() {
        let auth = service();
        assert!(!auth.dummy_hash.initialized());

        let err = auth.authenticate("ninguem@x.com", "qualquer").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let dummy = auth.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$2"));
        assert!(dummy.contains("$04$"));
    }

    #[test]
    fn reset_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
