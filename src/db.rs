// connexion BD + création du schéma au démarrage

use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use tracing::info;

use crate::models::{
    administration, candidature, convention, entreprise, etudiant, evaluation, offre, rapport,
    users,
};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    Database::connect(opt).await
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, index: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&index)).await?;
    Ok(())
}

/// Tables créées si absentes, dans l'ordre des clés étrangères
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, etudiant::Entity).await?;
    create_table(db, entreprise::Entity).await?;
    create_table(db, administration::Entity).await?;
    create_table(db, offre::Entity).await?;
    create_table(db, candidature::Entity).await?;
    create_table(db, convention::Entity).await?;
    create_table(db, rapport::Entity).await?;
    create_table(db, evaluation::Entity).await?;

    // Une candidature par (étudiant, offre), une évaluation par (stage, évaluateur)
    create_index(
        db,
        Index::create()
            .name("idx_candidatures_etudiant_offre")
            .table(candidature::Entity)
            .col(candidature::Column::EtudiantId)
            .col(candidature::Column::OffreId)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("idx_evaluations_convention_evaluateur")
            .table(evaluation::Entity)
            .col(evaluation::Column::ConventionId)
            .col(evaluation::Column::EvaluateurId)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    info!("Database schema ready");
    Ok(())
}
