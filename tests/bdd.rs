use std::{collections::HashMap, fmt, fs::File, net::SocketAddr};

use anyhow::Context;
use chrono::{DateTime, Utc};
use cucumber::{given, then, when, World as _};
use flaira::{
    auth::{self, AuthenticatedUser},
    config::AppConfig,
    db::init_pool,
    models::member::TripRole,
    services::{geo::GeoClient, mailer::Mailer, storage::MediaStore},
    state::AppState,
    trips::{
        answer_invite, create_trip,
        create::{
            CreateTripOutcome, CreateTripRequest, RouteLocation, StopEntry, Traveler,
            TravelerList, TripDetails, TripRoute,
        },
        InviteAnswer,
    },
};
use tempfile::TempDir;
use url::Url;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    users: HashMap<String, AuthenticatedUser>,
    outcome: Option<CreateTripOutcome>,
    creation_error: Option<String>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn user(&self, name: &str) -> &AuthenticatedUser {
        self.users
            .get(name)
            .unwrap_or_else(|| panic!("user {name:?} must be registered first"))
    }

    fn outcome(&self) -> &CreateTripOutcome {
        self.outcome
            .as_ref()
            .expect("a trip must have been created successfully")
    }

    async fn run_creation(&mut self, creator: &str, request: CreateTripRequest) {
        let creator_id = self.user(creator).id.clone();
        let result = match request.validate() {
            Ok(()) => create_trip(&self.app_state().db, &creator_id, &request).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.creation_error = None;
            }
            Err(err) => {
                self.outcome = None;
                self.creation_error = Some(err.to_string());
            }
        }
    }

    async fn count(&self, table: &str) -> i64 {
        let query = format!("SELECT COUNT(*) FROM {table}");
        sqlx::query_scalar(&query)
            .fetch_one(&self.app_state().db)
            .await
            .expect("count query")
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let media_root = root.path().join("media");
        std::fs::create_dir_all(&media_root)?;

        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            media_root: media_root.clone(),
            public_base_url: Url::parse("http://127.0.0.1:3000")?,
            frontend_origin: "http://localhost:3001".into(),
            cookie_secret: "bdd-cookie-secret".into(),
            geo_api_url: Url::parse("https://api.mapbox.com")?,
            geo_api_key: String::new(),
            mail_api_url: Url::parse("https://api.resend.com/emails")?,
            mail_api_key: String::new(),
            mail_from: "Flaira <trips@flaira.test>".into(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let media = MediaStore::new(config.media_root.clone());
        media.ensure_structure().await?;
        let geo = GeoClient::new(&config)?;
        let mailer = Mailer::new(&config)?;

        let app = AppState::new(config, db, media, geo, mailer);
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

fn sample_location(id: &str) -> RouteLocation {
    RouteLocation {
        id: id.to_string(),
        name: format!("{id} point"),
        address: Some(format!("1 {id} street")),
        city: Some("Lisbon".into()),
        country: Some("Portugal".into()),
        coordinates: [-9.14, 38.72],
    }
}

fn sample_request(
    title: &str,
    location_ids: &[&str],
    stop_ids: &[i64],
    traveler_emails: &[&str],
    traveler_role: TripRole,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> CreateTripRequest {
    CreateTripRequest {
        details: TripDetails {
            title: title.to_string(),
            description: None,
            start_date: start,
            end_date: end,
        },
        route: TripRoute {
            transport_mode: "driving".into(),
            estimated_duration: 5400.0,
            estimated_distance: 180_000.0,
            locations: location_ids.iter().map(|id| sample_location(id)).collect(),
            stops: stop_ids.iter().map(|id| StopEntry { id: *id }).collect(),
        },
        travelers: TravelerList {
            users: traveler_emails
                .iter()
                .map(|email| Traveler {
                    email: email.to_string(),
                    role: traveler_role.clone(),
                })
                .collect(),
        },
        memories: Vec::new(),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn default_start() -> DateTime<Utc> {
    "2026-06-01T09:00:00Z".parse().expect("valid timestamp")
}

fn default_end() -> DateTime<Utc> {
    "2026-06-05T09:00:00Z".parse().expect("valid timestamp")
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.users.clear();
    world.outcome = None;
    world.creation_error = None;
}

#[given(
    regex = r#"^a registered user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let created = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user");
    world.users.insert(username, created);
}

#[given("the invite store is broken")]
async fn given_broken_invite_store(world: &mut AppWorld) {
    sqlx::query("DROP TABLE trip_invites")
        .execute(&world.app_state().db)
        .await
        .expect("drop trip_invites");
}

#[when(
    regex = r#"^\"([^\"]+)\" creates a trip titled \"([^\"]+)\" with locations \"([^\"]+)\" and stops \"([^\"]*)\"$"#
)]
async fn when_create_with_locations(
    world: &mut AppWorld,
    creator: String,
    title: String,
    locations: String,
    stops: String,
) {
    let location_ids = parse_list(&locations);
    let location_refs: Vec<&str> = location_ids.iter().map(String::as_str).collect();
    let stop_ids: Vec<i64> = parse_list(&stops)
        .iter()
        .map(|raw| raw.parse().expect("numeric stop id"))
        .collect();
    let request = sample_request(
        &title,
        &location_refs,
        &stop_ids,
        &[],
        TripRole::Viewer,
        default_start(),
        Some(default_end()),
    );
    world.run_creation(&creator, request).await;
}

#[when(
    regex = r#"^\"([^\"]+)\" creates a trip titled \"([^\"]+)\" with travelers \"([^\"]+)\"$"#
)]
async fn when_create_with_travelers(
    world: &mut AppWorld,
    creator: String,
    title: String,
    travelers: String,
) {
    let emails = parse_list(&travelers);
    let email_refs: Vec<&str> = emails.iter().map(String::as_str).collect();
    let request = sample_request(
        &title,
        &["start", "end"],
        &[],
        &email_refs,
        TripRole::Viewer,
        default_start(),
        Some(default_end()),
    );
    world.run_creation(&creator, request).await;
}

#[when(
    regex = r#"^\"([^\"]+)\" creates a trip starting \"([^\"]+)\" and ending \"([^\"]+)\"$"#
)]
async fn when_create_with_dates(world: &mut AppWorld, creator: String, start: String, end: String) {
    let request = sample_request(
        "Dated trip",
        &["start", "end"],
        &[],
        &[],
        TripRole::Viewer,
        start.parse().expect("valid start timestamp"),
        Some(end.parse().expect("valid end timestamp")),
    );
    world.run_creation(&creator, request).await;
}

#[when(regex = r#"^\"([^\"]+)\" creates a trip starting \"([^\"]+)\" with no end date$"#)]
async fn when_create_open_ended(world: &mut AppWorld, creator: String, start: String) {
    let request = sample_request(
        "Open-ended trip",
        &["start", "end"],
        &[],
        &[],
        TripRole::Viewer,
        start.parse().expect("valid start timestamp"),
        None,
    );
    world.run_creation(&creator, request).await;
}

#[given(
    regex = r#"^\"([^\"]+)\" created a trip titled \"([^\"]+)\" inviting \"([^\"]+)\" as \"([^\"]+)\"$"#
)]
async fn given_trip_with_invite(
    world: &mut AppWorld,
    creator: String,
    title: String,
    email: String,
    role: String,
) {
    let role = match role.as_str() {
        "viewer" => TripRole::Viewer,
        "editor" => TripRole::Editor,
        "admin" => TripRole::Admin,
        other => panic!("unknown role {other:?}"),
    };
    let request = sample_request(
        &title,
        &["start", "end"],
        &[],
        &[email.as_str()],
        role,
        default_start(),
        Some(default_end()),
    );
    world.run_creation(&creator, request).await;
    assert!(
        world.creation_error.is_none(),
        "trip setup failed: {:?}",
        world.creation_error
    );
}

#[when(regex = r#"^\"([^\"]+)\" accepts that invite$"#)]
async fn when_accept_invite(world: &mut AppWorld, username: String) {
    answer_one_invite(world, &username, InviteAnswer::Accept).await;
}

#[when(regex = r#"^\"([^\"]+)\" declines that invite$"#)]
async fn when_decline_invite(world: &mut AppWorld, username: String) {
    answer_one_invite(world, &username, InviteAnswer::Decline).await;
}

async fn answer_one_invite(world: &mut AppWorld, username: &str, answer: InviteAnswer) {
    let invite_id = world
        .outcome()
        .invites_sent
        .first()
        .expect("an invite must exist")
        .invite_id
        .clone();
    let user = world.user(username).clone();
    answer_invite(&world.app_state().db, &user, &invite_id, answer)
        .await
        .expect("answer invite");
}

#[then("the creation succeeds")]
async fn then_creation_succeeds(world: &mut AppWorld) {
    assert!(
        world.creation_error.is_none(),
        "creation failed: {:?}",
        world.creation_error
    );
    assert!(world.outcome.is_some());
}

#[then("the creation fails")]
async fn then_creation_fails(world: &mut AppWorld) {
    assert!(world.creation_error.is_some(), "creation unexpectedly succeeded");
}

#[then(regex = r"^(\d+) trip rows? (?:is|are) stored$")]
async fn then_trip_count(world: &mut AppWorld, expected: i64) {
    assert_eq!(world.count("trips").await, expected);
}

#[then(regex = r"^(\d+) locations? (?:is|are) stored$")]
async fn then_location_count(world: &mut AppWorld, expected: i64) {
    assert_eq!(world.count("trip_locations").await, expected);
}

#[then(regex = r"^(\d+) memberships? (?:is|are) stored$")]
async fn then_membership_count(world: &mut AppWorld, expected: i64) {
    assert_eq!(world.count("trip_users").await, expected);
}

#[then(regex = r"^(\d+) invites? (?:is|are) stored$")]
async fn then_invite_count(world: &mut AppWorld, expected: i64) {
    assert_eq!(world.count("trip_invites").await, expected);
}

#[then(regex = r#"^the trip locations are \"([^\"]+)\"$"#)]
async fn then_trip_location_kinds(world: &mut AppWorld, expected: String) {
    let trip_id = world.outcome().trip_id.clone();
    let kinds: Vec<String> = sqlx::query_scalar(
        r#"SELECT kind FROM trip_locations WHERE trip_id = ?1
           ORDER BY CASE kind WHEN 'start' THEN 0 WHEN 'stop' THEN 1 ELSE 2 END,
                    stop_index"#,
    )
    .bind(&trip_id)
    .fetch_all(&world.app_state().db)
    .await
    .expect("load location kinds");
    assert_eq!(kinds, parse_list(&expected));
}

#[then(regex = r"^the stop location has index (\d+)$")]
async fn then_stop_index(world: &mut AppWorld, expected: i64) {
    let trip_id = world.outcome().trip_id.clone();
    let index: i64 = sqlx::query_scalar(
        "SELECT stop_index FROM trip_locations WHERE trip_id = ?1 AND kind = 'stop'",
    )
    .bind(&trip_id)
    .fetch_one(&world.app_state().db)
    .await
    .expect("load stop index");
    assert_eq!(index, expected);
}

#[then(regex = r#"^\"([^\"]+)\" holds the \"([^\"]+)\" membership added by themselves$"#)]
async fn then_self_added_membership(world: &mut AppWorld, username: String, role: String) {
    let user_id = world.user(&username).id.clone();
    let trip_id = world.outcome().trip_id.clone();
    let row: (String, String) = sqlx::query_as(
        "SELECT role, added_by FROM trip_users WHERE trip_id = ?1 AND user_id = ?2",
    )
    .bind(&trip_id)
    .bind(&user_id)
    .fetch_one(&world.app_state().db)
    .await
    .expect("load membership");
    assert_eq!(row.0, role);
    assert_eq!(row.1, user_id);
}

#[then(regex = r#"^\"([^\"]+)\" holds the \"([^\"]+)\" membership added by \"([^\"]+)\"$"#)]
async fn then_membership_added_by(
    world: &mut AppWorld,
    username: String,
    role: String,
    added_by: String,
) {
    let user_id = world.user(&username).id.clone();
    let adder_id = world.user(&added_by).id.clone();
    let trip_id = world.outcome().trip_id.clone();
    let row: (String, String) = sqlx::query_as(
        "SELECT role, added_by FROM trip_users WHERE trip_id = ?1 AND user_id = ?2",
    )
    .bind(&trip_id)
    .bind(&user_id)
    .fetch_one(&world.app_state().db)
    .await
    .expect("load membership");
    assert_eq!(row.0, role);
    assert_eq!(row.1, adder_id);
}

#[then(regex = r#"^(\d+) invites? (?:is|are) stored with status \"([^\"]+)\" and no invited user$"#)]
async fn then_invites_pending(world: &mut AppWorld, expected: i64, status: String) {
    let trip_id = world.outcome().trip_id.clone();
    let count: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM trip_invites
           WHERE trip_id = ?1 AND status = ?2
             AND invited_user_id IS NULL AND answered_at IS NULL"#,
    )
    .bind(&trip_id)
    .bind(&status)
    .fetch_one(&world.app_state().db)
    .await
    .expect("count invites");
    assert_eq!(count, expected);
}

#[then("the invite summaries match the stored invites")]
async fn then_invite_summaries_match(world: &mut AppWorld) {
    let outcome = world.outcome().clone();
    for summary in &outcome.invites_sent {
        let stored_email: String =
            sqlx::query_scalar("SELECT email FROM trip_invites WHERE id = ?1")
                .bind(&summary.invite_id)
                .fetch_one(&world.app_state().db)
                .await
                .expect("load invite by id");
        assert_eq!(stored_email, summary.email);
    }
}

#[then(regex = r"^the stored trip lasts (\d+) days?$")]
async fn then_trip_duration(world: &mut AppWorld, expected: i64) {
    let trip_id = world.outcome().trip_id.clone();
    let duration: i64 = sqlx::query_scalar("SELECT duration_days FROM trips WHERE id = ?1")
        .bind(&trip_id)
        .fetch_one(&world.app_state().db)
        .await
        .expect("load trip duration");
    assert_eq!(duration, expected);
}

#[then(regex = r#"^the stored trip ends on \"([^\"]+)\"$"#)]
async fn then_trip_end_date(world: &mut AppWorld, expected: String) {
    let trip_id = world.outcome().trip_id.clone();
    let end_date: DateTime<Utc> = sqlx::query_scalar("SELECT end_date FROM trips WHERE id = ?1")
        .bind(&trip_id)
        .fetch_one(&world.app_state().db)
        .await
        .expect("load trip end date");
    let expected: DateTime<Utc> = expected.parse().expect("valid expected timestamp");
    assert_eq!(end_date, expected);
}

#[then(regex = r#"^the invite status is \"([^\"]+)\" with an answered timestamp$"#)]
async fn then_invite_answered(world: &mut AppWorld, expected_status: String) {
    let invite_id = world
        .outcome()
        .invites_sent
        .first()
        .expect("an invite must exist")
        .invite_id
        .clone();
    let row: (String, Option<DateTime<Utc>>, Option<String>) = sqlx::query_as(
        "SELECT status, answered_at, invited_user_id FROM trip_invites WHERE id = ?1",
    )
    .bind(&invite_id)
    .fetch_one(&world.app_state().db)
    .await
    .expect("load invite");
    assert_eq!(row.0, expected_status);
    assert!(row.1.is_some(), "answered_at must be stamped");
    assert!(row.2.is_some(), "invitee must be linked to their account");
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
