use sea_orm::{ActiveModelTrait, DatabaseTransaction};

use crate::{EditorRef, ResultEngine, Revision, User, revisions};

mod create;
mod delete;
mod file;
mod list;
mod update;

/// Snapshot of the editor as it is at edit time.
fn editor_ref(user: &User) -> EditorRef {
    EditorRef {
        user_id: user.id.clone(),
        name: user.display_name.clone(),
        email: user.email.clone(),
    }
}

async fn append_revision(db_tx: &DatabaseTransaction, revision: &Revision) -> ResultEngine<()> {
    revisions::ActiveModel::try_from(revision)?
        .insert(db_tx)
        .await?;
    Ok(())
}
