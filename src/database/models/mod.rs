pub mod apply;
pub mod comment;
pub mod post;
pub mod user;

pub use apply::{Apply, ApplyState, ApplyView, NewApply};
pub use comment::{Comment, NewComment};
pub use post::{NewPost, Post, PostSummary};
pub use user::{FieldChange, NewUser, ProfileInfo, ProfileUpdate, User, UserHistory, UserInfo, UserProfile};
