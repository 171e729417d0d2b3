pub mod bmp;
pub mod handle;
pub mod obj;
pub mod store;

pub use bmp::{decode_bmp, load_bmp, Bmp, BmpError};
pub use handle::Handle;
pub use obj::{load_obj, parse_obj, ObjError, ObjMesh};
pub use store::ResourceStore;
