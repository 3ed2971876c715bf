mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{CountingSource, init_tracing};
use graph_driver::prelude::*;
use graph_driver::transaction::join_or_begin;

fn stmt() -> Statement {
    RelationshipDeleteStatements.delete_one(1)
}

/// A second request in the same context joins the first one's native
/// transaction instead of beginning another.
#[tokio::test]
async fn same_context_joins() -> Result<(), DriverError> {
    init_tracing();
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut outer = join_or_begin(&source, &manager, &ctx).await?;
    let mut inner = join_or_begin(&source, &manager, &ctx).await?;
    assert_eq!(outer.participation(), Participation::Creator);
    assert_eq!(inner.participation(), Participation::Joiner);
    assert_eq!(outer.transaction_id(), inner.transaction_id());
    assert_eq!(source.log.begun(), 1);

    inner.execute(&stmt()).await?;
    inner.commit().await?;
    inner.close().await?;
    assert_eq!(source.log.committed(), 0);

    outer.commit().await?;
    outer.close().await?;
    assert_eq!(source.log.committed(), 1);
    assert!(manager.current(&ctx).is_none());
    Ok(())
}

#[tokio::test]
async fn distinct_contexts_get_distinct_transactions() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let (a, b) = (ExecutionContext::new(), ExecutionContext::new());

    let mut tx_a = join_or_begin(&source, &manager, &a).await?;
    let mut tx_b = join_or_begin(&source, &manager, &b).await?;
    assert_ne!(tx_a.transaction_id(), tx_b.transaction_id());
    assert!(tx_b.is_creator());
    assert_eq!(manager.active_count(), 2);

    tx_a.close().await?;
    assert_eq!(manager.active_count(), 1);
    tx_b.commit().await?;
    tx_b.close().await?;
    assert_eq!(source.log.begun(), 2);
    assert_eq!(source.log.rolled_back(), 1);
    assert_eq!(source.log.committed(), 1);
    Ok(())
}

#[tokio::test]
async fn joiner_rollback_makes_creator_commit_fail() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut creator = join_or_begin(&source, &manager, &ctx).await?;
    let mut joiner = join_or_begin(&source, &manager, &ctx).await?;
    joiner.rollback().await?;
    assert_eq!(joiner.state(), TxState::RolledBack);
    assert!(creator.is_rollback_only());
    assert_eq!(source.log.rolled_back(), 0);
    joiner.close().await?;

    let err = creator.commit().await.unwrap_err();
    assert!(err.is_transaction_state());
    assert_eq!(creator.state(), TxState::RolledBack);
    assert_eq!(source.log.rolled_back(), 1);
    assert_eq!(source.log.committed(), 0);
    creator.close().await?;
    Ok(())
}

#[tokio::test]
async fn creator_cannot_commit_under_open_joiner() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut creator = join_or_begin(&source, &manager, &ctx).await?;
    let mut joiner = join_or_begin(&source, &manager, &ctx).await?;
    assert!(creator.commit().await.unwrap_err().is_transaction_state());
    assert_eq!(creator.state(), TxState::Open);

    joiner.commit().await?;
    creator.commit().await?;
    assert_eq!(source.log.committed(), 1);
    joiner.close().await?;
    creator.close().await?;
    Ok(())
}

#[tokio::test]
async fn finished_bindings_reject_further_work() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut tx = join_or_begin(&source, &manager, &ctx).await?;
    tx.commit().await?;
    assert!(tx.execute(&stmt()).await.unwrap_err().is_transaction_state());
    assert!(tx.commit().await.unwrap_err().is_transaction_state());
    assert!(tx.rollback().await.unwrap_err().is_transaction_state());

    // Committed but not closed: the context still holds it.
    assert!(
        join_or_begin(&source, &manager, &ctx)
            .await
            .unwrap_err()
            .is_transaction_state()
    );

    tx.close().await?;
    assert!(tx.close().await.unwrap_err().is_transaction_state());
    let mut next = join_or_begin(&source, &manager, &ctx).await?;
    assert!(next.is_creator());
    next.close().await?;
    Ok(())
}

#[tokio::test]
async fn bind_refuses_an_occupied_context() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut tx = join_or_begin(&source, &manager, &ctx).await?;
    let current = manager.current(&ctx).expect("registered");
    let err = manager.bind(&ctx, Arc::clone(&current)).unwrap_err();
    assert!(err.is_transaction_state());
    tx.close().await?;
    Ok(())
}

/// Dropping an open creator deregisters it and rolls the native
/// transaction back in the background.
#[tokio::test]
async fn dropped_creator_rolls_back() -> Result<(), DriverError> {
    init_tracing();
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    {
        let tx = join_or_begin(&source, &manager, &ctx).await?;
        tx.execute(&stmt()).await?;
    }
    assert!(manager.current(&ctx).is_none());
    for _ in 0..10 {
        if source.log.rolled_back() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(source.log.rolled_back(), 1);
    assert_eq!(source.log.committed(), 0);
    Ok(())
}

#[tokio::test]
async fn execution_errors_pass_through_untouched() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut tx = join_or_begin(&source, &manager, &ctx).await?;
    let err = tx
        .execute(&Statement::without_parameters("FAIL"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Statement execution error: forced failure");
    assert_eq!(tx.state(), TxState::Open);
    tx.rollback().await?;
    tx.close().await?;
    Ok(())
}

#[tokio::test]
async fn request_handler_auto_commits_outside_a_transaction() -> Result<(), DriverError> {
    let source = Arc::new(CountingSource::default());
    let manager = TransactionManager::new();
    let handler = RequestHandler::new(source.clone(), manager.clone());
    let ctx = ExecutionContext::new();

    handler.execute(&ctx, &stmt()).await?;
    assert_eq!(source.log.begun(), 1);
    assert_eq!(source.log.committed(), 1);

    let err = handler
        .execute(&ctx, &Statement::without_parameters("FAIL"))
        .await
        .unwrap_err();
    assert!(err.is_execution());
    assert_eq!(source.log.rolled_back(), 1);

    let unbound = Statement::without_parameters("MATCH (n) WHERE ID(n) = $id DELETE n");
    assert!(handler.execute(&ctx, &unbound).await.unwrap_err().is_execution());
    assert_eq!(source.log.begun(), 2);
    Ok(())
}

#[tokio::test]
async fn request_handler_uses_the_current_transaction() -> Result<(), DriverError> {
    let source = Arc::new(CountingSource::default());
    let manager = TransactionManager::new();
    let handler = RequestHandler::new(source.clone(), manager.clone());
    let ctx = ExecutionContext::new();

    let mut tx = join_or_begin(source.as_ref(), &manager, &ctx).await?;
    handler.execute(&ctx, &stmt()).await?;
    handler
        .execute_all(&ctx, &[stmt(), RelationshipDeleteStatements.delete_one(2)])
        .await?;
    assert_eq!(source.log.begun(), 1);
    assert_eq!(source.log.committed(), 0);
    assert_eq!(source.log.executed.lock().len(), 3);

    tx.commit().await?;
    tx.close().await?;
    assert_eq!(source.log.committed(), 1);
    Ok(())
}

#[tokio::test]
async fn execute_all_rolls_back_on_first_failure() -> Result<(), DriverError> {
    let source = Arc::new(CountingSource::default());
    let handler = RequestHandler::new(source.clone(), TransactionManager::new());
    let ctx = ExecutionContext::new();

    let err = handler
        .execute_all(
            &ctx,
            &[stmt(), Statement::without_parameters("FAIL"), stmt()],
        )
        .await
        .unwrap_err();
    assert!(err.is_execution());
    assert_eq!(source.log.executed.lock().len(), 1);
    assert_eq!(source.log.rolled_back(), 1);
    assert_eq!(source.log.committed(), 0);
    assert_eq!(handler.transaction_manager().active_count(), 0);
    Ok(())
}

/// A failing rollback is logged; the statement's own error is what the
/// caller sees.
#[tokio::test]
async fn failed_rollback_keeps_the_original_error() -> Result<(), DriverError> {
    init_tracing();
    let source = Arc::new(CountingSource::default());
    source.log.fail_rollback.store(true, Ordering::SeqCst);
    let handler = RequestHandler::new(source.clone(), TransactionManager::new());
    let ctx = ExecutionContext::new();

    let err = handler
        .execute_all(&ctx, &[Statement::without_parameters("FAIL")])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Statement execution error: forced failure");
    assert_eq!(handler.transaction_manager().active_count(), 0);

    let err = handler
        .execute(&ctx, &Statement::without_parameters("FAIL"))
        .await
        .unwrap_err();
    assert!(err.is_execution());
    assert_eq!(source.log.rolled_back(), 2);
    Ok(())
}

#[tokio::test]
async fn dropped_joiner_marks_the_transaction_rollback_only() -> Result<(), DriverError> {
    let source = CountingSource::default();
    let manager = TransactionManager::new();
    let ctx = ExecutionContext::new();

    let mut creator = join_or_begin(&source, &manager, &ctx).await?;
    drop(join_or_begin(&source, &manager, &ctx).await?);
    assert!(creator.is_rollback_only());

    assert!(creator.commit().await.unwrap_err().is_transaction_state());
    assert_eq!(source.log.committed(), 0);
    assert_eq!(source.log.rolled_back(), 1);
    creator.close().await?;
    Ok(())
}
