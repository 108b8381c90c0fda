// src/services/profile.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    common::{
        error::AppError,
        validation::{digits_only, normalize_email},
    },
    db::UserRepository,
    models::auth::{UpdateProfilePayload, User},
    services::auth::AuthService,
};

#[derive(Clone)]
pub struct ProfileService {
    auth: AuthService,
    users: Arc<dyn UserRepository>,
}

impl ProfileService {
    pub fn new(auth: AuthService, users: Arc<dyn UserRepository>) -> Self {
        Self { auth, users }
    }

    /// Atualiza telefone e CPF do dono da sessão. O e-mail enviado pelo
    /// formulário precisa ser o mesmo da sessão; caso contrário nada muda.
    pub async fn update_profile(
        &self,
        token: &str,
        payload: UpdateProfilePayload,
    ) -> Result<User, AppError> {
        let session = self
            .auth
            .get_session(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if normalize_email(&payload.email) != session.email {
            tracing::warn!(
                "Tentativa de alterar perfil com e-mail divergente da sessão {}.",
                session.id
            );
            return Err(AppError::Unauthorized);
        }

        payload.validate()?;

        let phone = digits_only(&payload.phone);
        let tax_id = digits_only(&payload.tax_id);

        if let Some(owner) = self.users.find_by_tax_id(&tax_id).await? {
            if owner.id != session.user_id {
                return Err(AppError::DuplicateTaxId);
            }
        }

        let user = self
            .users
            .update_contact(session.user_id, &phone, &tax_id)
            .await?;

        tracing::info!("✏️ Perfil do usuário {} atualizado.", user.id);
        Ok(user)
    }
}
