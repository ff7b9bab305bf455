//! Shared fixtures for handler tests: a memory-backed app and token helpers.

use std::{path::PathBuf, sync::Arc};

use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web,
};
use uuid::Uuid;

use crate::auth::jwt::{Subject, generate_access_token};
use crate::config::Config;
use crate::documents::LocalDocumentStorage;
use crate::model::employee::{EmployeeCategory, NewEmployee};
use crate::model::role::Role;
use crate::routes::{self, Limiters};
use crate::store::{Store, memory::MemoryStore};

pub struct TestApp {
    pub config: Config,
    pub memory: Arc<MemoryStore>,
    document_root: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        let document_root = std::env::temp_dir().join(format!("attendance-desk-{}", Uuid::new_v4()));
        let config = Config::from_lookup(|key| match key {
            "STORE_BACKEND" => Some("memory".into()),
            "JWT_SECRET" => Some("test-secret".into()),
            "RATE_LIMIT_ENABLED" => Some("false".into()),
            _ => None,
        })
        .unwrap();
        Self {
            config,
            memory: Arc::new(MemoryStore::new()),
            document_root,
        }
    }

    pub fn document_root(&self) -> &PathBuf {
        &self.document_root
    }

    pub async fn employee(&self, category: EmployeeCategory) -> u64 {
        self.memory
            .insert_employee(&NewEmployee {
                name: format!("{} employee", category.as_ref()),
                email: None,
                category,
                shift_start: None,
                shift_end: None,
            })
            .await
            .unwrap()
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let store: Arc<dyn Store> = self.memory.clone();
        let config = self.config.clone();
        let limiters = Limiters::from_config(&config).unwrap();
        App::new()
            .app_data(web::Data::from(store))
            .app_data(web::Data::new(LocalDocumentStorage::new(&self.document_root)))
            .app_data(web::Data::new(config.clone()))
            .configure(move |cfg| routes::configure(cfg, &config, limiters))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.document_root);
    }
}

/// `Authorization` header for a user with the given role.
pub fn bearer(config: &Config, role: Role, employee_id: Option<u64>) -> (&'static str, String) {
    let subject = Subject {
        user_id: 100 + role.id() as u64,
        username: format!("{role:?}").to_lowercase(),
        role: role.id(),
        employee_id,
    };
    let token = generate_access_token(&subject, &config.jwt_secret, 300).unwrap();
    ("Authorization", format!("Bearer {token}"))
}
