use crate::transaction::CsvRow;
use tokio_stream::StreamExt;

pub type Reader = dyn tokio::io::AsyncRead + Send + Sync + Unpin;

pub async fn read_csv(reader: &mut Reader) -> impl futures::Stream<Item = Result<CsvRow, anyhow::Error>> + '_ {
    csv_async::AsyncReaderBuilder::new()
        .flexible(true)
        .trim(csv_async::Trim::All)
        .create_deserializer(reader)
        .into_deserialize::<CsvRow>()
        .map(|record| record.map_err(anyhow::Error::from))
}
