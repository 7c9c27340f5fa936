use crate::domain::order::Quote;
use crate::error::{GatewayError, Result};
use std::io::Read;

/// Reads quotes from a CSV source.
///
/// Expected header:
/// `quote_id,grand_total,currency_code,customer_id,customer_email,billing_email,customer_group_id,payment_method`.
/// Empty optional columns become `None`.
pub struct QuoteReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> QuoteReader<R> {
    /// Creates a new `QuoteReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes quotes.
    pub fn quotes(self) -> impl Iterator<Item = Result<Quote>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(GatewayError::from))
    }
}
