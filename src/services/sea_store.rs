//! SeaORM-backed operation store
//!
//! One store value implements [`Repository`] for every operation kind, each
//! against its own table. Every write is committed on its own.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

use crate::entities::{injection_operations, movement_commands, scan_operations};
use crate::models::injection::{Injection, InjectionOperation, InjectionStatus};
use crate::models::movement::{
    Axis, Direction, Movement, MovementAction, MovementCommand, MovementStatus,
};
use crate::models::operation::{Operation, OperationKind};
use crate::models::scan::{Scan, ScanOperation, ScanStatus};
use crate::services::operation_store::{ListSpec, Repository, SortOrder, StoreError};

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Apply owner/status filters, ordering and pagination to a select
fn apply_spec<E: EntityTrait>(
    mut query: Select<E>,
    spec: &ListSpec,
    user_id: E::Column,
    status: E::Column,
    created_at: E::Column,
    id: E::Column,
) -> Select<E> {
    if let Some(owner) = &spec.owner {
        query = query.filter(user_id.eq(owner.clone()));
    }
    if let Some(wanted) = &spec.status {
        query = query.filter(status.eq(wanted.clone()));
    }

    query = match spec.order {
        SortOrder::NewestFirst => query.order_by_desc(created_at).order_by_desc(id),
        SortOrder::OldestFirst => query.order_by_asc(created_at).order_by_asc(id),
    };

    if spec.skip > 0 {
        query = query.offset(spec.skip);
    }
    if let Some(take) = spec.take {
        query = query.limit(take);
    }
    query
}

fn corrupt<K: OperationKind>(id: i32, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        kind: K::LABEL,
        id,
        reason: reason.to_string(),
    }
}

/// An update that touched no row means the id is unknown
fn missing_on_update<K: OperationKind>(id: i32, err: DbErr) -> StoreError {
    match err {
        DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => StoreError::Missing { kind: K::LABEL, id },
        other => StoreError::Database(other),
    }
}

// ---------------------------------------------------------------------------
// Scans
// ---------------------------------------------------------------------------

fn scan_from_model(m: scan_operations::Model) -> Result<ScanOperation, StoreError> {
    let id = m.id;
    let status = m.status.parse::<ScanStatus>().map_err(|e| corrupt::<Scan>(id, e))?;
    let readings: Vec<f64> =
        serde_json::from_value(m.sensor_readings).map_err(|e| corrupt::<Scan>(id, e))?;

    Ok(Operation {
        id,
        user_id: m.user_id,
        status,
        details: Scan { readings },
        error_message: m.error_message,
        started_at: m.started_at.with_timezone(&Utc),
        ended_at: m.ended_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn scan_active_model(op: &ScanOperation) -> scan_operations::ActiveModel {
    scan_operations::ActiveModel {
        id: NotSet,
        user_id: Set(op.user_id.clone()),
        status: Set(op.status.to_string()),
        sensor_readings: Set(serde_json::json!(op.details.readings)),
        error_message: Set(op.error_message.clone()),
        started_at: Set(op.started_at.into()),
        ended_at: Set(op.ended_at.map(Into::into)),
        created_at: Set(op.created_at.into()),
        updated_at: Set(op.updated_at.into()),
    }
}

#[async_trait]
impl Repository<Scan> for SeaOrmStore {
    async fn get_by_id(&self, id: i32) -> Result<Option<ScanOperation>, StoreError> {
        scan_operations::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(scan_from_model)
            .transpose()
    }

    async fn list(&self, spec: &ListSpec) -> Result<Vec<ScanOperation>, StoreError> {
        let query = apply_spec(
            scan_operations::Entity::find(),
            spec,
            scan_operations::Column::UserId,
            scan_operations::Column::Status,
            scan_operations::Column::CreatedAt,
            scan_operations::Column::Id,
        );
        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(scan_from_model)
            .collect()
    }

    async fn add(&self, op: ScanOperation) -> Result<ScanOperation, StoreError> {
        let inserted = scan_active_model(&op).insert(&self.db).await?;
        scan_from_model(inserted)
    }

    async fn update(&self, op: &ScanOperation) -> Result<(), StoreError> {
        let mut model = scan_active_model(op);
        model.id = Unchanged(op.id);
        model
            .update(&self.db)
            .await
            .map_err(|e| missing_on_update::<Scan>(op.id, e))?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = scan_operations::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Injections
// ---------------------------------------------------------------------------

fn injection_from_model(m: injection_operations::Model) -> Result<InjectionOperation, StoreError> {
    let id = m.id;
    let status = m
        .status
        .parse::<InjectionStatus>()
        .map_err(|e| corrupt::<Injection>(id, e))?;

    Ok(Operation {
        id,
        user_id: m.user_id,
        status,
        details: Injection {
            range_from: m.range_from,
            range_to: m.range_to,
            step: m.step,
            volume: m.volume,
            element_count: m.element_count,
        },
        error_message: m.error_message,
        started_at: m.started_at.with_timezone(&Utc),
        ended_at: m.ended_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn injection_active_model(op: &InjectionOperation) -> injection_operations::ActiveModel {
    injection_operations::ActiveModel {
        id: NotSet,
        user_id: Set(op.user_id.clone()),
        status: Set(op.status.to_string()),
        range_from: Set(op.details.range_from),
        range_to: Set(op.details.range_to),
        step: Set(op.details.step),
        volume: Set(op.details.volume),
        element_count: Set(op.details.element_count),
        error_message: Set(op.error_message.clone()),
        started_at: Set(op.started_at.into()),
        ended_at: Set(op.ended_at.map(Into::into)),
        created_at: Set(op.created_at.into()),
        updated_at: Set(op.updated_at.into()),
    }
}

#[async_trait]
impl Repository<Injection> for SeaOrmStore {
    async fn get_by_id(&self, id: i32) -> Result<Option<InjectionOperation>, StoreError> {
        injection_operations::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(injection_from_model)
            .transpose()
    }

    async fn list(&self, spec: &ListSpec) -> Result<Vec<InjectionOperation>, StoreError> {
        let query = apply_spec(
            injection_operations::Entity::find(),
            spec,
            injection_operations::Column::UserId,
            injection_operations::Column::Status,
            injection_operations::Column::CreatedAt,
            injection_operations::Column::Id,
        );
        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(injection_from_model)
            .collect()
    }

    async fn add(&self, op: InjectionOperation) -> Result<InjectionOperation, StoreError> {
        let inserted = injection_active_model(&op).insert(&self.db).await?;
        injection_from_model(inserted)
    }

    async fn update(&self, op: &InjectionOperation) -> Result<(), StoreError> {
        let mut model = injection_active_model(op);
        model.id = Unchanged(op.id);
        model
            .update(&self.db)
            .await
            .map_err(|e| missing_on_update::<Injection>(op.id, e))?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = injection_operations::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

fn movement_from_model(m: movement_commands::Model) -> Result<MovementCommand, StoreError> {
    let id = m.id;
    let status = m
        .status
        .parse::<MovementStatus>()
        .map_err(|e| corrupt::<Movement>(id, e))?;
    let action = m
        .action
        .parse::<MovementAction>()
        .map_err(|e| corrupt::<Movement>(id, e))?;
    let axis = m.axis.parse::<Axis>().map_err(|e| corrupt::<Movement>(id, e))?;
    let direction =
        Direction::from_sign(i32::from(m.direction)).map_err(|e| corrupt::<Movement>(id, e))?;

    Ok(Operation {
        id,
        user_id: m.user_id,
        status,
        details: Movement {
            action,
            axis,
            direction,
            speed: m.speed,
            steps: m.steps,
        },
        error_message: m.error_message,
        started_at: m.started_at.with_timezone(&Utc),
        ended_at: m.ended_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn movement_active_model(cmd: &MovementCommand) -> movement_commands::ActiveModel {
    movement_commands::ActiveModel {
        id: NotSet,
        user_id: Set(cmd.user_id.clone()),
        status: Set(cmd.status.to_string()),
        action: Set(cmd.details.action.to_string()),
        axis: Set(cmd.details.axis.to_string()),
        direction: Set(cmd.details.direction.sign()),
        speed: Set(cmd.details.speed),
        steps: Set(cmd.details.steps),
        error_message: Set(cmd.error_message.clone()),
        started_at: Set(cmd.started_at.into()),
        ended_at: Set(cmd.ended_at.map(Into::into)),
        created_at: Set(cmd.created_at.into()),
        updated_at: Set(cmd.updated_at.into()),
    }
}

#[async_trait]
impl Repository<Movement> for SeaOrmStore {
    async fn get_by_id(&self, id: i32) -> Result<Option<MovementCommand>, StoreError> {
        movement_commands::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(movement_from_model)
            .transpose()
    }

    async fn list(&self, spec: &ListSpec) -> Result<Vec<MovementCommand>, StoreError> {
        let query = apply_spec(
            movement_commands::Entity::find(),
            spec,
            movement_commands::Column::UserId,
            movement_commands::Column::Status,
            movement_commands::Column::CreatedAt,
            movement_commands::Column::Id,
        );
        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(movement_from_model)
            .collect()
    }

    async fn add(&self, cmd: MovementCommand) -> Result<MovementCommand, StoreError> {
        let inserted = movement_active_model(&cmd).insert(&self.db).await?;
        movement_from_model(inserted)
    }

    async fn update(&self, cmd: &MovementCommand) -> Result<(), StoreError> {
        let mut model = movement_active_model(cmd);
        model.id = Unchanged(cmd.id);
        model
            .update(&self.db)
            .await
            .map_err(|e| missing_on_update::<Movement>(cmd.id, e))?;
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = movement_commands::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::operation_store::ListSpec;
    use chrono::FixedOffset;
    use sea_orm::{DbBackend, QueryTrait};

    fn scan_sql(spec: &ListSpec) -> String {
        apply_spec(
            scan_operations::Entity::find(),
            spec,
            scan_operations::Column::UserId,
            scan_operations::Column::Status,
            scan_operations::Column::CreatedAt,
            scan_operations::Column::Id,
        )
        .build(DbBackend::Postgres)
        .to_string()
    }

    #[test]
    fn test_list_query_filters_owner_and_pages_newest_first() {
        let sql = scan_sql(&ListSpec::recent_for("alice", 10).skip(2));
        assert!(sql.contains(r#"WHERE "scan_operations"."user_id" = 'alice'"#), "{sql}");
        assert!(
            sql.contains(
                r#"ORDER BY "scan_operations"."created_at" DESC, "scan_operations"."id" DESC"#
            ),
            "{sql}"
        );
        assert!(sql.ends_with("LIMIT 10 OFFSET 2"), "{sql}");
        assert!(!sql.contains(r#""scan_operations"."status" ="#), "{sql}");
    }

    #[test]
    fn test_list_query_status_filter_and_oldest_first() {
        let sql = scan_sql(
            &ListSpec::owned_by("bob")
                .with_status(ScanStatus::Unconfirmed)
                .oldest_first(),
        );
        assert!(sql.contains(r#""scan_operations"."user_id" = 'bob'"#), "{sql}");
        assert!(sql.contains(r#""scan_operations"."status" = 'unconfirmed'"#), "{sql}");
        assert!(
            sql.contains(
                r#"ORDER BY "scan_operations"."created_at" ASC, "scan_operations"."id" ASC"#
            ),
            "{sql}"
        );
        assert!(!sql.contains("LIMIT"), "{sql}");
        assert!(!sql.contains("OFFSET"), "{sql}");
    }

    #[test]
    fn test_unowned_list_query_has_no_owner_filter() {
        let sql = scan_sql(&ListSpec::default());
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    fn timestamp() -> chrono::DateTime<FixedOffset> {
        Utc::now().into()
    }

    #[test]
    fn test_scan_model_conversion() {
        let model = scan_operations::Model {
            id: 3,
            user_id: "alice".to_string(),
            status: "success".to_string(),
            sensor_readings: serde_json::json!([1.5, 2.5]),
            error_message: None,
            started_at: timestamp(),
            ended_at: Some(timestamp()),
            created_at: timestamp(),
            updated_at: timestamp(),
        };
        let op = scan_from_model(model).unwrap();
        assert_eq!(op.id, 3);
        assert_eq!(op.status, ScanStatus::Success);
        assert_eq!(op.details.readings, vec![1.5, 2.5]);
    }

    #[test]
    fn test_unknown_status_is_reported_as_corrupt_row() {
        let model = scan_operations::Model {
            id: 9,
            user_id: "alice".to_string(),
            status: "stopped".to_string(),
            sensor_readings: serde_json::json!([]),
            error_message: None,
            started_at: timestamp(),
            ended_at: None,
            created_at: timestamp(),
            updated_at: timestamp(),
        };
        let err = scan_from_model(model).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { kind: "scan", id: 9, .. }));
    }

    #[test]
    fn test_movement_active_model_stores_strings() {
        let cmd = Operation::new(
            "alice",
            MovementStatus::InProgress,
            Movement {
                action: MovementAction::Home,
                axis: Axis::All,
                direction: Direction::Positive,
                speed: 50,
                steps: 0,
            },
            Utc::now(),
        );
        let model = movement_active_model(&cmd);
        assert_eq!(model.action, Set("home".to_string()));
        assert_eq!(model.axis, Set("ALL".to_string()));
        assert_eq!(model.status, Set("in_progress".to_string()));
        assert_eq!(model.direction, Set(1));
    }
}
