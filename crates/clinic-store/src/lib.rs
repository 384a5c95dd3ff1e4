pub mod codec;
pub mod csv_file;
pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod store;

pub use codec::{
    DecodedTable, decode_patients, decode_sessions, encode_patient, encode_session,
    patch_patient_row, patch_session_row,
};
pub use csv_file::CsvSheetStore;
pub use error::{Result, StoreError};
pub use memory::MemorySheetStore;
pub use schema::{PATIENT_COLUMNS, QuarantinedRow, SESSION_COLUMNS, TableSchema};
pub use store::{RecordStore, Revision, TableId, TableSnapshot};
