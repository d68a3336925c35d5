//! LanceDB connection and table helpers.

use anyhow::Result;
use arrow_array::{RecordBatch, RecordBatchIterator};
use lancedb::{connect, Connection, Table};

use crate::schema::vector_dim;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

/// Opens the table if it exists.
pub async fn open_table(conn: &Connection, name: &str) -> Result<Option<Table>> {
    if !table_exists(conn, name).await? {
        return Ok(None);
    }
    Ok(Some(conn.open_table(name).execute().await?))
}

/// Dimension of an existing table's vector column.
pub async fn table_dim(table: &Table) -> Result<Option<usize>> {
    let schema = table.schema().await?;
    Ok(vector_dim(&schema))
}

/// Appends the batch, creating the table from it on first write.
pub async fn append_batch(conn: &Connection, name: &str, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    match open_table(conn, name).await? {
        Some(table) => {
            table.add(reader).execute().await?;
        }
        None => {
            conn.create_table(name, reader).execute().await?;
        }
    }
    Ok(())
}
