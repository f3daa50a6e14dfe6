use futures::StreamExt;

use crate::transaction::CsvRow;

pub type Writer = dyn tokio::io::AsyncWrite + Send + Sync + Unpin;

pub async fn write_csv(writer: &mut Writer, with_headers: bool, mut row_stream: impl futures::Stream<Item = CsvRow> + Send + Unpin) -> Result<usize, anyhow::Error> {
    let mut writer = csv_async::AsyncWriterBuilder::new()
        .has_headers(with_headers)
        .create_serializer(writer);

    let mut written = 0;
    while let Some(row) = row_stream.next().await {
        writer.serialize(row).await?;
        written += 1;
    }
    writer.flush().await?;

    Ok(written)
}
