use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Contact, CreatePartyCmd, CreateProjectCmd, CreateTransactionCmd, Engine, EngineError,
    ErrorKind, PartyCategory, PartyPatch, ProjectPatch, ProjectStatus, TransactionKind,
    TransactionListFilter,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    engine.create_user("alice", "password").await.unwrap();
    engine.create_user("bob", "password").await.unwrap();
    (engine, db)
}

#[tokio::test]
async fn project_defaults_and_validation() {
    let (engine, _db) = engine_with_db().await;

    let project = engine
        .create_project(CreateProjectCmd::new("alice", "  Villa Rossi ", "VR-01"))
        .await
        .unwrap();
    assert_eq!(project.title, "Villa Rossi");
    assert_eq!(project.status, ProjectStatus::Planned);
    assert_eq!(project.budget_minor, 0);
    assert_eq!(project.totals.balance_minor, 0);

    let err = engine
        .create_project(CreateProjectCmd::new("alice", " ", "X-1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .create_project(CreateProjectCmd::new("alice", "Shed", "SH-1").budget_minor(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn project_code_is_unique_per_owner_ignoring_case() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01"))
        .await
        .unwrap();
    let err = engine
        .create_project(CreateProjectCmd::new("alice", "Other villa", "vr-01"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("vr-01".to_string()));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Another owner may reuse the code.
    engine
        .create_project(CreateProjectCmd::new("bob", "Villa", "VR-01"))
        .await
        .unwrap();
}

#[tokio::test]
async fn project_patch_updates_fields_not_totals() {
    let (engine, _db) = engine_with_db().await;
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01"))
        .await
        .unwrap();
    engine
        .create_project(CreateProjectCmd::new("alice", "Garage", "GR-01"))
        .await
        .unwrap();

    let err = engine
        .update_project(
            project.id,
            "alice",
            ProjectPatch {
                code: Some("gr-01".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let updated = engine
        .update_project(
            project.id,
            "alice",
            ProjectPatch {
                title: Some("Villa Rossi".to_string()),
                budget_minor: Some(50_000),
                status: Some(ProjectStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Villa Rossi");
    assert_eq!(updated.code, "VR-01");
    assert_eq!(updated.budget_minor, 50_000);
    assert_eq!(updated.status, ProjectStatus::Active);
    let stored = engine.project(project.id, "alice").await.unwrap();
    assert_eq!(stored.title, updated.title);
    assert_eq!(stored.budget_minor, 50_000);
    assert_eq!(stored.status, ProjectStatus::Active);

    let err = engine
        .update_project(project.id, "bob", ProjectPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn party_names_contacts_and_category() {
    let (engine, _db) = engine_with_db().await;
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01"))
        .await
        .unwrap();

    let party = engine
        .create_party(
            CreatePartyCmd::new(project.id, "alice", "Cement Srl", PartyCategory::Vendor).contact(
                Contact {
                    phone: Some(" 555 ".to_string()),
                    email: Some("".to_string()),
                    address: None,
                },
            ),
        )
        .await
        .unwrap();
    assert_eq!(party.contact.phone.as_deref(), Some("555"));
    assert_eq!(party.contact.email, None);

    let err = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "CEMENT  srl",
            PartyCategory::Client,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .update_party(
            party.id,
            "alice",
            PartyPatch {
                email: Some("not-an-email".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let updated = engine
        .update_party(
            party.id,
            "alice",
            PartyPatch {
                name: Some("Cement Spa".to_string()),
                phone: Some(String::new()),
                email: Some("office@cement.it".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Cement Spa");
    assert_eq!(updated.category, PartyCategory::Vendor);
    assert_eq!(updated.contact.phone, None);
    assert_eq!(updated.contact.email.as_deref(), Some("office@cement.it"));

    let listed = engine.list_parties(project.id, "alice").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, updated.id);
    assert_eq!(listed[0].name, "Cement Spa");
    assert_eq!(listed[0].contact, updated.contact);

    let err = engine.party(party.id, "bob").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("party not exists".to_string()));
}

#[tokio::test]
async fn party_with_active_transactions_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01"))
        .await
        .unwrap();
    let client = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Rossi",
            PartyCategory::Client,
        ))
        .await
        .unwrap();
    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            100,
            "alice",
        ))
        .await
        .unwrap();

    let err = engine.delete_party(client.id, "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    engine.soft_delete_transaction(tx.id, "alice").await.unwrap();
    engine.delete_party(client.id, "alice").await.unwrap();
    assert!(engine.list_parties(project.id, "alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn project_delete_requires_force_when_parties_exist() {
    let (engine, db) = engine_with_db().await;
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01"))
        .await
        .unwrap();
    let client = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Rossi",
            PartyCategory::Client,
        ))
        .await
        .unwrap();
    engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            100,
            "alice",
        ))
        .await
        .unwrap();

    let err = engine
        .delete_project(project.id, "alice", false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = engine
        .delete_project(project.id, "bob", true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    engine.delete_project(project.id, "alice", true).await.unwrap();
    assert!(engine.list_projects("alice").await.unwrap().is_empty());
    let err = engine.party(client.id, "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Transaction rows survive but are no longer reachable.
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT COUNT(*) AS n FROM transactions",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "n").unwrap(), 1);
    let page = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(page.transactions.is_empty());
}

#[tokio::test]
async fn empty_project_deletes_without_force() {
    let (engine, _db) = engine_with_db().await;
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01"))
        .await
        .unwrap();
    engine.delete_project(project.id, "alice", false).await.unwrap();
    let err = engine.project(project.id, "alice").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("project not exists".to_string()));
}

#[tokio::test]
async fn summary_breaks_totals_down_by_party() {
    let (engine, _db) = engine_with_db().await;
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa", "VR-01").budget_minor(1_000))
        .await
        .unwrap();
    let client = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Rossi",
            PartyCategory::Client,
        ))
        .await
        .unwrap();
    let vendor = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Cement",
            PartyCategory::Vendor,
        ))
        .await
        .unwrap();
    let idle = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Tiles",
            PartyCategory::Vendor,
        ))
        .await
        .unwrap();

    for (party, kind, amount) in [
        (client.id, TransactionKind::Income, 400),
        (client.id, TransactionKind::Income, 100),
        (vendor.id, TransactionKind::Expense, 250),
    ] {
        engine
            .create_transaction(CreateTransactionCmd::new(
                project.id, party, kind, amount, "alice",
            ))
            .await
            .unwrap();
    }

    let summary = engine.project_summary(project.id, "alice").await.unwrap();
    assert_eq!(summary.project.totals.total_income_minor, 500);
    assert_eq!(summary.project.totals.total_expense_minor, 250);
    assert_eq!(summary.budget_remaining_minor, 750);

    let by_name = |name: &str| {
        summary
            .parties
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .unwrap()
    };
    let rossi = by_name("Rossi");
    assert_eq!((rossi.income_minor, rossi.expense_minor, rossi.count), (500, 0, 2));
    let cement = by_name("Cement");
    assert_eq!((cement.income_minor, cement.expense_minor, cement.count), (0, 250, 1));
    let tiles = by_name("Tiles");
    assert_eq!(tiles.party_id, idle.id);
    assert_eq!(tiles.count, 0);
}
