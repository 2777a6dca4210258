// src/shift_store.rs
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::timesheet::{
    apply_shift_patch, validate_new_shift, NewShift, ShiftError, ShiftPatch, ShiftRecord,
};

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Shift not found: {id}")]
    ShiftNotFound { id: String },
    #[error("Employee not found: {id}")]
    EmployeeNotFound { id: String },
    #[error("An account already exists for {email}")]
    EmailTaken { email: String },
    #[error(transparent)]
    Invalid(#[from] ShiftError),
}

// --- User Records ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// User projection served to clients; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl UserRecord {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

// --- Shift Record Store ---

/// Single source of truth for users and shifts. Shifts live in a Vec so
/// insertion order is preserved; the rollup tie-break guarantee depends on
/// listings replaying creation order.
#[derive(Clone)]
pub struct ShiftStore {
    users: Arc<Mutex<HashMap<String, UserRecord>>>,
    shifts: Arc<Mutex<Vec<ShiftRecord>>>,
}

fn random_id(prefix: &str) -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{}_{}", prefix, suffix)
}

impl ShiftStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            shifts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // --- User Operations ---

    pub fn register_user(
        &self,
        name: &str,
        email: &str,
        role: Role,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            warn!("Registration rejected, email already in use: {}", email);
            return Err(StoreError::EmailTaken {
                email: email.to_string(),
            });
        }

        let user = UserRecord {
            id: random_id("usr"),
            name: name.to_string(),
            email: email.to_string(),
            role,
            password_hash: password_hash.to_string(),
        };
        info!("Registered {:?} account {} ({})", role, user.id, user.email);
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    pub fn user(&self, id: &str) -> Option<UserRecord> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<UserRecord> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    /// All non-admin accounts, sorted by name for stable listings.
    pub fn list_employees(&self) -> Vec<PublicUser> {
        let mut employees: Vec<PublicUser> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.role == Role::User)
            .map(UserRecord::public)
            .collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        employees
    }

    // --- Shift Operations ---

    pub fn create_shift(&self, owner_id: &str, draft: &NewShift) -> Result<ShiftRecord, StoreError> {
        let validated = validate_new_shift(draft)?;
        let record = ShiftRecord {
            id: random_id("shf"),
            owner_id: owner_id.to_string(),
            date: validated.date,
            start_time: validated.start_time,
            end_time: validated.end_time,
            task: validated.task,
            comment: validated.comment,
            duration_hours: validated.duration_hours,
        };
        info!(
            "Created shift {} for {} on {} ({}h)",
            record.id, owner_id, record.date, record.duration_hours
        );
        self.shifts.lock().unwrap().push(record.clone());
        Ok(record)
    }

    pub fn get_shift(&self, owner_id: &str, id: &str) -> Result<ShiftRecord, StoreError> {
        let shifts = self.shifts.lock().unwrap();
        owned_shift(&shifts, owner_id, id).cloned()
    }

    /// One owner's shifts in creation order.
    pub fn shifts_for_owner(&self, owner_id: &str) -> Vec<ShiftRecord> {
        self.shifts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect()
    }

    pub fn update_shift(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ShiftPatch,
    ) -> Result<ShiftRecord, StoreError> {
        let mut shifts = self.shifts.lock().unwrap();
        let position = owned_shift_position(&shifts, owner_id, id)?;
        let updated = apply_shift_patch(&shifts[position], patch)?;
        info!(
            "Updated shift {} for {} ({}h on {})",
            id, owner_id, updated.duration_hours, updated.date
        );
        shifts[position] = updated.clone();
        Ok(updated)
    }

    pub fn delete_shift(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        let mut shifts = self.shifts.lock().unwrap();
        let position = owned_shift_position(&shifts, owner_id, id)?;
        shifts.remove(position);
        info!("Deleted shift {} for {}", id, owner_id);
        Ok(())
    }

    /// The full shift set across all owners, in creation order. Admin-only
    /// callers; administrators read but never mutate other owners' shifts.
    pub fn all_shifts(&self) -> Vec<ShiftRecord> {
        self.shifts.lock().unwrap().clone()
    }
}

impl Default for ShiftStore {
    fn default() -> Self {
        Self::new()
    }
}

fn owned_shift<'a>(
    shifts: &'a [ShiftRecord],
    owner_id: &str,
    id: &str,
) -> Result<&'a ShiftRecord, StoreError> {
    let position = owned_shift_position(shifts, owner_id, id)?;
    Ok(&shifts[position])
}

// A shift belonging to someone else does not exist from the caller's point
// of view, so a cross-owner id also reports ShiftNotFound.
fn owned_shift_position(
    shifts: &[ShiftRecord],
    owner_id: &str,
    id: &str,
) -> Result<usize, StoreError> {
    match shifts.iter().position(|s| s.id == id) {
        Some(position) if shifts[position].owner_id == owner_id => Ok(position),
        Some(_) => {
            warn!("Owner {} addressed foreign shift {}", owner_id, id);
            Err(StoreError::ShiftNotFound { id: id.to_string() })
        }
        None => Err(StoreError::ShiftNotFound { id: id.to_string() }),
    }
}
