pub mod quote_reader;
