pub use mediator::DefaultAsyncMediator;
use sqlx::PgPool;

use crate::deletion::DatasetDeleter;

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(pool: PgPool, deleter: DatasetDeleter) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Datasets
        .add_handler({
            let pool = pool.clone();
            let deleter = deleter.clone();
            move |cmd| {
                let pool = pool.clone();
                let deleter = deleter.clone();
                async move {
                    crate::features::datasets::commands::delete::handle(pool, deleter, cmd).await
                }
            }
        })
        .add_handler({
            let pool = pool.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::datasets::queries::get::handle(pool, query).await }
            }
        })
        .build()
}
