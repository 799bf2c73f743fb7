// In-memory doubles shared by unit and router tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    Argon2PasswordService, AuthService, JwtCodec, NewRefreshToken, NewUser, RefreshToken,
    RefreshTokenRepository, RegisterRequest, Role, TokenIssuer, User, UserChanges, UserRepository,
};
use crate::categories::{Category, CategoryRepository, CategoryService};
use crate::error::{ServiceError, ServiceResult};
use crate::events::repository::{already_joined_error, capacity_error};
use crate::events::{
    Event, EventDetails, EventFilter, EventParticipation, EventRepository, EventRequest,
    EventService, Image, NewEvent, NewImage, ParticipatedEvent, ParticipationRepository,
};
use crate::pagination::Page;
use crate::storage::BlobStore;
use crate::users::UserService;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret-with-enough-entropy-for-hs256";

fn paginate<T>(items: Vec<T>, page: Page) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let window = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (window, total)
}

#[derive(Default)]
struct StoreState {
    users: HashMap<Uuid, User>,
    tokens: Vec<RefreshToken>,
    categories: HashMap<Uuid, Category>,
    events: HashMap<Uuid, Event>,
    images: HashMap<Uuid, Image>,
    participations: Vec<(u64, EventParticipation)>,
    next_seq: u64,
    revoke_before_rotation: bool,
}

impl StoreState {
    fn details(&self, event: &Event) -> Option<EventDetails> {
        let category = self.categories.get(&event.category_id)?.clone();
        let participant_count = self
            .participations
            .iter()
            .filter(|(_, p)| p.event_id == event.id)
            .count() as i64;
        Some(EventDetails {
            event: event.clone(),
            category,
            image: self.images.get(&event.id).cloned(),
            participant_count,
        })
    }

    fn participant_count(&self, event_id: Uuid) -> i64 {
        self.participations
            .iter()
            .filter(|(_, p)| p.event_id == event_id)
            .count() as i64
    }

    fn push_participation(&mut self, participation: EventParticipation) {
        self.next_seq += 1;
        self.participations.push((self.next_seq, participation));
    }

    fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != excluding)
    }
}

/// Single store implementing every repository trait
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    roles_seeded: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            roles_seeded: true,
        }
    }

    /// Store whose role table was never seeded
    pub fn without_roles() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            roles_seeded: false,
        }
    }

    pub async fn insert_user(&self, user: NewUser, roles: &[Role]) -> User {
        let user = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            date_of_birth: user.date_of_birth,
            registered_at: user.registered_at,
            roles: roles.to_vec(),
        };
        self.state.write().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Tokens of the user in issue order
    pub async fn tokens_for(&self, user_id: Uuid) -> Vec<RefreshToken> {
        self.state
            .read()
            .await
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn issue_token(&self, user_id: Uuid) -> RefreshToken {
        let now = Utc::now();
        let token = NewRefreshToken {
            token_hash: Uuid::new_v4().to_string(),
            user_id,
            issued_at: now,
            expires_at: now + Duration::days(7),
        };
        RefreshTokenRepository::insert(self, token).await.unwrap()
    }

    /// Adds `count` anonymous participants, ignoring capacity
    pub async fn add_participants(&self, event_id: Uuid, count: usize) {
        let mut state = self.state.write().await;
        for _ in 0..count {
            state.push_participation(EventParticipation {
                event_id,
                user_id: Uuid::new_v4(),
                registered_at: Utc::now(),
            });
        }
    }

    pub async fn participant_count(&self, event_id: Uuid) -> i64 {
        self.state.read().await.participant_count(event_id)
    }

    /// Simulates a concurrent refresh winning the race on the next rotation
    pub async fn revoke_before_next_rotation(&self) {
        self.state.write().await.revoke_before_rotation = true;
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> ServiceResult<bool> {
        Ok(self.state.read().await.email_taken(email, excluding))
    }

    async fn create_with_role(&self, user: NewUser, role: Role) -> ServiceResult<User> {
        if !self.roles_seeded {
            return Err(ServiceError::database(format!("Role '{}' is not configured", role)));
        }
        if self.state.read().await.email_taken(&user.email, None) {
            return Err(ServiceError::already_exists("User with email", &user.email));
        }
        Ok(self.insert_user(user, &[role]).await)
    }

    async fn update_profile(&self, id: Uuid, changes: UserChanges) -> ServiceResult<Option<User>> {
        let mut state = self.state.write().await;
        if state.email_taken(&changes.email, Some(id)) {
            return Err(ServiceError::already_exists("User with email", &changes.email));
        }
        Ok(state.users.get_mut(&id).map(|user| {
            user.first_name = changes.first_name;
            user.last_name = changes.last_name;
            user.email = changes.email;
            user.date_of_birth = changes.date_of_birth;
            user.clone()
        }))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> ServiceResult<()> {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<bool> {
        let mut state = self.state.write().await;
        state.participations.retain(|(_, p)| p.user_id != id);
        state.tokens.retain(|t| t.user_id != id);
        Ok(state.users.remove(&id).is_some())
    }

    async fn list(&self, page: Page) -> ServiceResult<(Vec<User>, u64)> {
        let mut users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(paginate(users, page))
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn insert(&self, token: NewRefreshToken) -> ServiceResult<RefreshToken> {
        let stored = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: token.token_hash,
            user_id: token.user_id,
            revoked: false,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        };
        self.state.write().await.tokens.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_hash(&self, token_hash: &str) -> ServiceResult<Option<RefreshToken>> {
        Ok(self
            .state
            .read()
            .await
            .tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> ServiceResult<bool> {
        let mut state = self.state.write().await;
        match state.tokens.iter_mut().find(|t| t.id == id && !t.revoked) {
            Some(token) => {
                token.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> ServiceResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for token in state
            .tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && !t.revoked)
        {
            token.revoked = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        replacement: NewRefreshToken,
    ) -> ServiceResult<Option<RefreshToken>> {
        let mut state = self.state.write().await;
        if std::mem::take(&mut state.revoke_before_rotation) {
            if let Some(token) = state.tokens.iter_mut().find(|t| t.id == old_id) {
                token.revoked = true;
            }
        }

        match state.tokens.iter_mut().find(|t| t.id == old_id && !t.revoked) {
            Some(token) => token.revoked = true,
            None => return Ok(None),
        }

        let stored = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: replacement.token_hash,
            user_id: replacement.user_id,
            revoked: false,
            issued_at: replacement.issued_at,
            expires_at: replacement.expires_at,
        };
        state.tokens.push(stored.clone());
        Ok(Some(stored))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn list(&self, page: Page) -> ServiceResult<(Vec<Category>, u64)> {
        let mut categories: Vec<Category> =
            self.state.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(categories, page))
    }

    async fn find_by_id(&self, id: Uuid) -> ServiceResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Category>> {
        Ok(self
            .state
            .read()
            .await
            .categories
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn insert(&self, name: &str) -> ServiceResult<Category> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(ServiceError::already_exists("Category", name));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: Uuid, name: &str) -> ServiceResult<Option<Category>> {
        let mut state = self.state.write().await;
        if state
            .categories
            .values()
            .any(|c| c.id != id && c.name.eq_ignore_ascii_case(name))
        {
            return Err(ServiceError::already_exists("Category", name));
        }
        Ok(state.categories.get_mut(&id).map(|category| {
            category.name = name.to_string();
            category.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<bool> {
        let mut state = self.state.write().await;
        if state.events.values().any(|e| e.category_id == id) {
            return Err(ServiceError::invalid_input("Category is still used by events"));
        }
        Ok(state.categories.remove(&id).is_some())
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn list(&self, filter: &EventFilter, page: Page) -> ServiceResult<(Vec<EventDetails>, u64)> {
        let state = self.state.read().await;
        let mut matching: Vec<EventDetails> = state
            .events
            .values()
            .filter_map(|event| state.details(event))
            .filter(|details| filter.matches(details))
            .collect();
        matching.sort_by(|a, b| {
            b.event
                .starts_at
                .cmp(&a.event.starts_at)
                .then(a.event.id.cmp(&b.event.id))
        });
        Ok(paginate(matching, page))
    }

    async fn find_details(&self, id: Uuid) -> ServiceResult<Option<EventDetails>> {
        let state = self.state.read().await;
        Ok(state.events.get(&id).and_then(|event| state.details(event)))
    }

    async fn insert(&self, event: NewEvent) -> ServiceResult<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            name: event.name,
            description: event.description,
            starts_at: event.starts_at,
            location: event.location,
            max_participants: event.max_participants,
            category_id: event.category_id,
        };
        self.state.write().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update(&self, id: Uuid, changes: NewEvent) -> ServiceResult<Option<Event>> {
        let mut state = self.state.write().await;
        Ok(state.events.get_mut(&id).map(|event| {
            event.name = changes.name;
            event.description = changes.description;
            event.starts_at = changes.starts_at;
            event.location = changes.location;
            event.max_participants = changes.max_participants;
            event.category_id = changes.category_id;
            event.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<bool> {
        let mut state = self.state.write().await;
        state.images.remove(&id);
        state.participations.retain(|(_, p)| p.event_id != id);
        Ok(state.events.remove(&id).is_some())
    }

    async fn replace_image(&self, event_id: Uuid, image: NewImage) -> ServiceResult<(Image, Option<Image>)> {
        let stored = Image {
            id: Uuid::new_v4(),
            event_id,
            path: image.path,
            content_type: image.content_type,
            uploaded_at: image.uploaded_at,
        };
        let previous = self
            .state
            .write()
            .await
            .images
            .insert(event_id, stored.clone());
        Ok((stored, previous))
    }

    async fn delete_image(&self, event_id: Uuid) -> ServiceResult<Option<Image>> {
        Ok(self.state.write().await.images.remove(&event_id))
    }
}

#[async_trait]
impl ParticipationRepository for InMemoryStore {
    async fn is_participant(&self, event_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .participations
            .iter()
            .any(|(_, p)| p.event_id == event_id && p.user_id == user_id))
    }

    async fn add_participant(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> ServiceResult<EventParticipation> {
        let mut state = self.state.write().await;
        let max = state
            .events
            .get(&event_id)
            .map(|e| e.max_participants)
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;

        if state
            .participations
            .iter()
            .any(|(_, p)| p.event_id == event_id && p.user_id == user_id)
        {
            return Err(already_joined_error());
        }
        if state.participant_count(event_id) >= i64::from(max) {
            return Err(capacity_error());
        }

        let participation = EventParticipation {
            event_id,
            user_id,
            registered_at,
        };
        state.push_participation(participation.clone());
        Ok(participation)
    }

    async fn remove_participant(&self, event_id: Uuid, user_id: Uuid) -> ServiceResult<bool> {
        let mut state = self.state.write().await;
        let before = state.participations.len();
        state
            .participations
            .retain(|(_, p)| !(p.event_id == event_id && p.user_id == user_id));
        Ok(state.participations.len() < before)
    }

    async fn list_for_user(&self, user_id: Uuid, page: Page) -> ServiceResult<(Vec<ParticipatedEvent>, u64)> {
        let state = self.state.read().await;
        let mut own: Vec<&(u64, EventParticipation)> = state
            .participations
            .iter()
            .filter(|(_, p)| p.user_id == user_id)
            .collect();
        own.sort_by(|(seq_a, a), (seq_b, b)| {
            b.registered_at
                .cmp(&a.registered_at)
                .then(seq_b.cmp(seq_a))
        });

        let items = own
            .into_iter()
            .filter_map(|(_, p)| {
                let event = state.events.get(&p.event_id)?;
                Some(ParticipatedEvent {
                    registered_at: p.registered_at,
                    event: state.details(event)?,
                })
            })
            .collect();
        Ok(paginate(items, page))
    }
}

/// Blob store keeping payloads in memory, with switchable failures
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, directory: &str, original_name: &str, bytes: &[u8]) -> ServiceResult<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::file_system("Failed to store file"));
        }
        let locator = format!(
            "{}/{}",
            directory.trim_matches('/'),
            crate::storage::unique_file_name(original_name)
        );
        self.blobs.write().await.insert(locator.clone(), bytes.to_vec());
        Ok(locator)
    }

    async fn delete(&self, locator: &str) -> ServiceResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ServiceError::file_system("Failed to delete file"));
        }
        self.blobs.write().await.remove(locator);
        Ok(())
    }
}

pub fn sample_user(email: &str) -> NewUser {
    NewUser {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
        registered_at: Utc::now(),
    }
}

/// A user value with roles that never touches a store
pub fn loaded_user(email: &str, roles: &[Role]) -> User {
    let new_user = sample_user(email);
    User {
        id: Uuid::new_v4(),
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        email: new_user.email,
        password_hash: new_user.password_hash,
        date_of_birth: new_user.date_of_birth,
        registered_at: new_user.registered_at,
        roles: roles.to_vec(),
    }
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: "Secret123!".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
    }
}

pub fn event_request(category_id: Uuid) -> EventRequest {
    EventRequest {
        name: "Summer Jazz Night".to_string(),
        description: "Open air concert".to_string(),
        starts_at: Utc::now() + Duration::days(30),
        location: "Blue Note, Berlin".to_string(),
        max_participants: 10,
        category_id,
    }
}

pub async fn seed_category(store: &InMemoryStore, name: &str) -> Category {
    CategoryRepository::insert(store, name).await.unwrap()
}

pub async fn seed_event(store: &InMemoryStore, category_id: Uuid, max_participants: i32) -> Event {
    let mut request = event_request(category_id);
    request.max_participants = max_participants;
    EventRepository::insert(store, request.into_new_event())
        .await
        .unwrap()
}

fn fast_passwords() -> Argon2PasswordService {
    Argon2PasswordService::with_params(argon2::Params::new(8, 1, 1, None).unwrap())
}

fn codec() -> JwtCodec {
    JwtCodec::new(TEST_SECRET, Duration::minutes(15))
}

pub fn auth_service(store: &Arc<InMemoryStore>) -> AuthService {
    let issuer = TokenIssuer::new(codec(), Duration::days(7), store.clone(), store.clone());
    AuthService::new(
        store.clone(),
        store.clone(),
        Arc::new(fast_passwords()),
        issuer,
    )
}

/// Application state wired entirely to in-memory doubles
pub fn app_state(store: &Arc<InMemoryStore>, blobs: &Arc<MemoryBlobStore>) -> AppState {
    AppState {
        auth_service: Arc::new(auth_service(store)),
        category_service: Arc::new(CategoryService::new(store.clone())),
        event_service: Arc::new(EventService::new(
            store.clone(),
            store.clone(),
            blobs.clone(),
        )),
        user_service: Arc::new(UserService::new(
            store.clone(),
            store.clone(),
            store.clone(),
        )),
        jwt: codec(),
    }
}
