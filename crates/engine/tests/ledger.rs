use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    CreatePartyCmd, CreateProjectCmd, CreateTransactionCmd, Engine, EngineError, ErrorKind,
    Party, PartyCategory, Project, ProjectTotals, TransactionKind, TransactionListFilter,
    TransactionPatch, UpdateTransactionCmd,
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

async fn project_with_parties(engine: &Engine) -> (Project, Party, Party) {
    let project = engine
        .create_project(CreateProjectCmd::new("alice", "Villa Rossi", "VR-01").budget_minor(10_000))
        .await
        .unwrap();
    let client = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Rossi family",
            PartyCategory::Client,
        ))
        .await
        .unwrap();
    let vendor = engine
        .create_party(CreatePartyCmd::new(
            project.id,
            "alice",
            "Cement Srl",
            PartyCategory::Vendor,
        ))
        .await
        .unwrap();
    (project, client, vendor)
}

async fn totals(engine: &Engine, project_id: Uuid) -> ProjectTotals {
    let totals = engine.project(project_id, "alice").await.unwrap().totals;
    assert!(totals.is_consistent());
    totals
}

#[tokio::test]
async fn ledger_scenario_keeps_totals_in_step() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, vendor) = project_with_parties(&engine).await;
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(0, 0));

    let t1 = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            500,
            "alice",
        ))
        .await
        .unwrap();
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(500, 0));

    let t2 = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            vendor.id,
            TransactionKind::Expense,
            200,
            "alice",
        ))
        .await
        .unwrap();
    let after_t2 = totals(&engine, project.id).await;
    assert_eq!(after_t2, ProjectTotals::new(500, 200));
    assert_eq!(after_t2.balance_minor, 300);

    let updated = engine
        .update_transaction(UpdateTransactionCmd::new(
            t1.id,
            "alice",
            TransactionPatch::default().amount_minor(700),
        ))
        .await
        .unwrap();
    assert_eq!(updated.amount_minor, 700);
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(700, 200));

    engine.soft_delete_transaction(t2.id, "alice").await.unwrap();
    let end = totals(&engine, project.id).await;
    assert_eq!(end, ProjectTotals::new(700, 0));
    assert_eq!(end.balance_minor, 700);
}

#[tokio::test]
async fn client_party_rejects_expense_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, _vendor) = project_with_parties(&engine).await;

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Expense,
            100,
            "alice",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KindMismatch(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_eq!(totals(&engine, project.id).await, ProjectTotals::default());
    let page = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(page.transactions.is_empty());
}

#[tokio::test]
async fn create_checks_run_in_order() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, _vendor) = project_with_parties(&engine).await;

    // Policy is checked before the amount.
    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Expense,
            0,
            "alice",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KindMismatch(_)));

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            0,
            "alice",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            Uuid::new_v4(),
            TransactionKind::Income,
            100,
            "alice",
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("party not exists".to_string())
    );

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            100,
            "bob",
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("project not exists".to_string())
    );
}

#[tokio::test]
async fn party_of_another_project_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let (project, _client, _vendor) = project_with_parties(&engine).await;
    let other = engine
        .create_project(CreateProjectCmd::new("alice", "Garage", "GR-02"))
        .await
        .unwrap();
    let other_client = engine
        .create_party(CreatePartyCmd::new(
            other.id,
            "alice",
            "Bianchi",
            PartyCategory::Client,
        ))
        .await
        .unwrap();

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            other_client.id,
            TransactionKind::Income,
            100,
            "alice",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn kind_change_moves_amount_and_respects_policy() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, _vendor) = project_with_parties(&engine).await;

    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            300,
            "alice",
        ))
        .await
        .unwrap();

    // The party is a client, so it cannot become an expense.
    let err = engine
        .update_transaction(UpdateTransactionCmd::new(
            tx.id,
            "alice",
            TransactionPatch::default().kind(TransactionKind::Expense),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KindMismatch(_)));
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(300, 0));

    let err = engine
        .update_transaction(UpdateTransactionCmd::new(
            tx.id,
            "alice",
            TransactionPatch::default().amount_minor(-5),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(300, 0));
}

#[tokio::test]
async fn note_patch_keeps_totals() {
    let (engine, _db) = engine_with_db().await;
    let (project, _client, vendor) = project_with_parties(&engine).await;

    let tx = engine
        .create_transaction(
            CreateTransactionCmd::new(
                project.id,
                vendor.id,
                TransactionKind::Expense,
                90,
                "alice",
            )
            .note("bricks"),
        )
        .await
        .unwrap();
    assert_eq!(tx.note.as_deref(), Some("bricks"));

    let updated = engine
        .update_transaction(UpdateTransactionCmd::new(
            tx.id,
            "alice",
            TransactionPatch::default().note(""),
        ))
        .await
        .unwrap();
    assert_eq!(updated.note, None);
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(0, 90));
}

#[tokio::test]
async fn soft_deleted_transactions_disappear_from_reads() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, vendor) = project_with_parties(&engine).await;

    let income = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            1_000,
            "alice",
        ))
        .await
        .unwrap();
    let expense = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            vendor.id,
            TransactionKind::Expense,
            400,
            "alice",
        ))
        .await
        .unwrap();

    engine
        .soft_delete_transaction(expense.id, "alice")
        .await
        .unwrap();

    let page = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 1);
    assert_eq!(page.transactions[0].id, income.id);
    assert_eq!(page.summary.income_minor, 1_000);
    assert_eq!(page.summary.expense_minor, 0);
    assert_eq!(page.summary.net_minor, 1_000);
    assert_eq!(page.summary.count, 1);

    let err = engine.transaction(expense.id, "alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // A second delete is a miss, and does not touch totals again.
    let err = engine
        .soft_delete_transaction(expense.id, "alice")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(1_000, 0));
}

#[tokio::test]
async fn other_users_cannot_reach_transactions() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, _vendor) = project_with_parties(&engine).await;

    let tx = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            250,
            "alice",
        ))
        .await
        .unwrap();

    assert!(engine.owned_project_ids("bob").await.unwrap().is_empty());
    assert_eq!(
        engine.resolve_owned_transaction("bob", tx.id).await,
        Err(EngineError::KeyNotFound(
            "transaction not exists".to_string()
        ))
    );
    let err = engine
        .update_transaction(UpdateTransactionCmd::new(
            tx.id,
            "bob",
            TransactionPatch::default().amount_minor(1),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = engine
        .soft_delete_transaction(tx.id, "bob")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let page = engine
        .list_transactions("bob", &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(page.transactions.is_empty());

    let filter = TransactionListFilter {
        project_id: Some(project.id),
        ..Default::default()
    };
    let err = engine.list_transactions("bob", &filter).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(250, 0));
}

#[tokio::test]
async fn list_filters_order_and_summary() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, vendor) = project_with_parties(&engine).await;
    let base = Utc::now() - Duration::days(10);

    for (days, party, kind, amount) in [
        (0, client.id, TransactionKind::Income, 100),
        (1, vendor.id, TransactionKind::Expense, 30),
        (2, client.id, TransactionKind::Income, 200),
        (3, vendor.id, TransactionKind::Expense, 50),
    ] {
        engine
            .create_transaction(
                CreateTransactionCmd::new(project.id, party, kind, amount, "alice")
                    .occurred_at(base + Duration::days(days)),
            )
            .await
            .unwrap();
    }

    let page = engine
        .list_transactions(
            "alice",
            &TransactionListFilter {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let amounts: Vec<i64> = page.transactions.iter().map(|t| t.amount_minor).collect();
    assert_eq!(amounts, vec![50, 200]);
    // The summary is not cut by the limit.
    assert_eq!(page.summary.income_minor, 300);
    assert_eq!(page.summary.expense_minor, 80);
    assert_eq!(page.summary.net_minor, 220);
    assert_eq!(page.summary.count, 4);

    let page = engine
        .list_transactions(
            "alice",
            &TransactionListFilter {
                kind: Some(TransactionKind::Expense),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page.summary.income_minor, 0);
    assert_eq!(page.summary.expense_minor, 80);

    let page = engine
        .list_transactions(
            "alice",
            &TransactionListFilter {
                party_id: Some(client.id),
                from: Some(base + Duration::days(1)),
                to: Some(base + Duration::days(3)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 1);
    assert_eq!(page.transactions[0].amount_minor, 200);
    assert_eq!(page.summary.count, 1);
}

#[tokio::test]
async fn recompute_repairs_drifted_totals() {
    let (engine, db) = engine_with_db().await;
    let (project, client, vendor) = project_with_parties(&engine).await;

    engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            800,
            "alice",
        ))
        .await
        .unwrap();
    let expense = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            vendor.id,
            TransactionKind::Expense,
            300,
            "alice",
        ))
        .await
        .unwrap();
    engine
        .soft_delete_transaction(expense.id, "alice")
        .await
        .unwrap();

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE projects SET total_income_minor = 1, balance_minor = 99 WHERE id = ?",
        vec![project.id.to_string().into()],
    ))
    .await
    .unwrap();

    let project = engine
        .recompute_project_totals(project.id, "alice")
        .await
        .unwrap();
    assert_eq!(project.totals, ProjectTotals::new(800, 0));
    assert_eq!(totals(&engine, project.id).await, ProjectTotals::new(800, 0));
}

#[tokio::test]
async fn writes_that_overflow_the_accumulators_are_refused() {
    let (engine, _db) = engine_with_db().await;
    let (project, client, vendor) = project_with_parties(&engine).await;

    engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            i64::MAX - 10,
            "alice",
        ))
        .await
        .unwrap();
    let last = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            10,
            "alice",
        ))
        .await
        .unwrap();
    assert_eq!(
        totals(&engine, project.id).await,
        ProjectTotals::new(i64::MAX, 0)
    );

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            client.id,
            TransactionKind::Income,
            1,
            "alice",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = engine
        .update_transaction(UpdateTransactionCmd::new(
            last.id,
            "alice",
            TransactionPatch::default().amount_minor(11),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Nothing was written and the project stays readable.
    assert_eq!(
        totals(&engine, project.id).await,
        ProjectTotals::new(i64::MAX, 0)
    );
    let page = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page.summary.income_minor, i64::MAX);

    engine
        .create_transaction(CreateTransactionCmd::new(
            project.id,
            vendor.id,
            TransactionKind::Expense,
            5,
            "alice",
        ))
        .await
        .unwrap();
    let project = engine
        .recompute_project_totals(project.id, "alice")
        .await
        .unwrap();
    assert_eq!(project.totals, ProjectTotals::new(i64::MAX, 5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_lose_no_increment() {
    let path = std::env::temp_dir().join(format!("sitebook-{}.db", Uuid::new_v4()));
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(
        Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap(),
    );
    engine.create_user("alice", "password").await.unwrap();
    let (project, client, _) = project_with_parties(&engine).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .create_transaction(CreateTransactionCmd::new(
                    project.id,
                    client.id,
                    TransactionKind::Income,
                    100,
                    "alice",
                ))
                .await
        }));
    }
    let mut ok_count = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok_count += 1;
        }
    }
    assert!(ok_count > 0);

    let after = totals(&engine, project.id).await;
    assert_eq!(after.total_income_minor, 100 * ok_count);
    assert_eq!(after.balance_minor, 100 * ok_count);
    let page = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(page.summary.count, ok_count as u64);

    db.close().await.unwrap();
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
