// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::clock::{Clock, SystemClock},
    db::Repositories,
    services::{
        auth::AuthSettings,
        notification::{HttpMailer, LogMailer, Mailer},
        AuthService, CollectionService, CompanyService, ProfileService,
    },
};

// Configuração lida do ambiente (.env carregado pelo dotenvy)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub unsubscribe_url: String,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: optional_var("DATABASE_URL"),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: optional_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            session_ttl_hours: check_session_ttl(parse_var("SESSION_TTL_HOURS", 24 * 7)?)
                .context("SESSION_TTL_HOURS fora do intervalo permitido")?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            email_api_url: optional_var("EMAIL_API_URL")
                .unwrap_or_else(|| "https://api.resend.com/emails".into()),
            email_api_key: optional_var("EMAIL_API_KEY"),
            email_from: optional_var("EMAIL_FROM")
                .unwrap_or_else(|| "E-Coleta <nao-responda@ecoleta.com.br>".into()),
            unsubscribe_url: optional_var("UNSUBSCRIBE_URL")
                .unwrap_or_else(|| "https://ecoleta.com.br/descadastrar".into()),
            secure_cookies: parse_var("SECURE_COOKIES", true)?,
        })
    }
}

// De 1 hora a 1 ano
const SESSION_TTL_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

fn check_session_ttl(hours: i64) -> anyhow::Result<i64> {
    if !SESSION_TTL_HOURS_RANGE.contains(&hours) {
        anyhow::bail!(
            "{} horas (esperado entre {} e {})",
            hours,
            SESSION_TTL_HOURS_RANGE.start(),
            SESSION_TTL_HOURS_RANGE.end()
        );
    }
    Ok(hours)
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} tem um valor inválido: {}", key, raw)),
        None => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub collection_service: CollectionService,
    pub company_service: CompanyService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let repos = match &config.database_url {
            Some(database_url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&db_pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Repositories::postgres(db_pool)
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL não definida: usando armazenamento em memória.");
                Repositories::in_memory(clock.clone())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.email_api_key {
            Some(api_key) => Arc::new(HttpMailer::new(
                config.email_api_url.clone(),
                api_key.clone(),
                config.email_from.clone(),
            )),
            None => {
                tracing::warn!("⚠️ EMAIL_API_KEY não definida: e-mails serão apenas logados.");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::from_parts(config, repos, mailer, clock))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        config: Config,
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auth_service = AuthService::new(
            &repos,
            mailer,
            clock.clone(),
            AuthSettings {
                jwt_secret: config.jwt_secret.clone(),
                session_ttl: chrono::Duration::hours(config.session_ttl_hours),
                bcrypt_cost: config.bcrypt_cost,
                unsubscribe_url: config.unsubscribe_url.clone(),
            },
        );
        let profile_service = ProfileService::new(auth_service.clone(), repos.users.clone());
        let collection_service = CollectionService::new(&repos, clock);
        let company_service = CompanyService::new(repos.companies.clone(), config.bcrypt_cost);

        Self {
            config: Arc::new(config),
            auth_service,
            profile_service,
            collection_service,
            company_service,
        }
    }
}
