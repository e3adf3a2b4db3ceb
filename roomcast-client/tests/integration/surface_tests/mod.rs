pub mod test_code_sync;
