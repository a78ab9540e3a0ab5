pub mod cache;
pub mod clock;
pub mod coordinator;
pub mod editor;
pub mod error;
pub mod pending;
pub mod projection;
pub mod session;
pub mod validation;

pub use cache::{CacheStatus, UsersCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::MutationCoordinator;
pub use editor::{EditorState, RecordEditor, Submission};
pub use error::{ErrorSurface, SyncError};
pub use pending::{MutationKind, PendingOperations};
pub use projection::{project, Projection, TableView};
pub use session::UsersSession;
pub use validation::{validate, Field, ValidationErrors};
