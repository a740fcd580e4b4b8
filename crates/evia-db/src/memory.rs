//! In-memory store implementations for testing
//!
//! `MemoryStore` implements every store trait over shared maps, so services and
//! handlers can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use evia_core::{
    models::{Complaint, Drug, Session, User},
    AppError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{ComplaintStore, DrugStore, OneTimeCodeStore, SessionStore, UserStore};

#[derive(Default)]
struct State {
    users: Vec<User>,
    sessions: Vec<Session>,
    complaints: Vec<Complaint>,
    drugs: Vec<Drug>,
    codes: HashMap<String, (String, DateTime<Utc>)>,
}

/// Mock store for testing without database
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    fail_complaint_inserts: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent complaint insert fail like a rolled-back transaction.
    pub fn fail_complaint_inserts(&self, fail: bool) {
        self.fail_complaint_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn add_user(&self, email: &str, password_hash: &str) -> User {
        let mut state = self.state.lock().unwrap();
        let user = User {
            id: state.users.len() as i64 + 1,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        user
    }

    pub fn add_session(&self, user_id: i64, token: Uuid, expires_at: DateTime<Utc>) -> Session {
        let mut state = self.state.lock().unwrap();
        let session = Session {
            id: state.sessions.len() as i64 + 1,
            user_id,
            token,
            expires_at,
            created_at: Utc::now(),
        };
        state.sessions.push(session.clone());
        session
    }

    pub fn add_complaint(&self, complaint: Complaint) {
        self.state.lock().unwrap().complaints.push(complaint);
    }

    pub fn add_drug(&self, drug: Drug) {
        self.state.lock().unwrap().drugs.push(drug);
    }

    pub fn complaints(&self) -> Vec<Complaint> {
        self.state.lock().unwrap().complaints.clone()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Raw code lookup, ignoring expiry.
    pub fn code(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .codes
            .get(key)
            .map(|(value, _)| value.clone())
    }

    /// Force a stored code to be expired.
    pub fn expire_code(&self, key: &str) {
        if let Some(entry) = self.state.lock().unwrap().codes.get_mut(key) {
            entry.1 = Utc::now() - Duration::seconds(1);
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.user_by_email(email))
    }

    async fn create_with_session(
        &self,
        email: &str,
        password_hash: &str,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(User, Session), AppError> {
        if self.user_by_email(email).is_some() {
            return Err(AppError::Internal(
                "duplicate key value violates unique constraint \"users_email_key\"".to_string(),
            ));
        }
        let user = self.add_user(email, password_hash);
        let session = self.add_session(user.id, token, expires_at);
        Ok((user, session))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        match state.users.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(
        &self,
        user_id: i64,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        Ok(self.add_session(user_id, token, expires_at))
    }

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Session>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.sessions.iter().find(|s| s.token == token).cloned())
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn insert(&self, complaint: &Complaint) -> Result<(), AppError> {
        if self.fail_complaint_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "complaint insert failed; transaction rolled back".to_string(),
            ));
        }
        self.add_complaint(complaint.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Complaint>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.complaints.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Complaint>, AppError> {
        let state = self.state.lock().unwrap();
        let mut owned: Vec<Complaint> = state
            .complaints
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<Option<Complaint>, AppError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.complaints.iter_mut().find(|c| c.id == id).map(|c| {
            c.title = title.to_string();
            c.clone()
        }))
    }
}

#[async_trait]
impl DrugStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Drug>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.drugs.iter().find(|d| d.id == id).cloned())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<Drug>, AppError> {
        let needle = name.to_lowercase();
        let state = self.state.lock().unwrap();
        Ok(state
            .drugs
            .iter()
            .filter(|d| {
                d.name.to_lowercase().contains(&needle)
                    || d.brand_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OneTimeCodeStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        self.state
            .lock()
            .unwrap()
            .codes
            .insert(key.to_string(), (value.to_string(), Utc::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .codes
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(value, _)| value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.state.lock().unwrap().codes.remove(key);
        Ok(())
    }
}
