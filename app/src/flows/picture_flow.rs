// vitrine_app/src/flows/picture_flow.rs

//! Creating and editing pictures: validate the upload, settle title and slug,
//! write the file, persist the row, then drop the file an edit replaced.
//!
//! A file written by `store_file` is removed again if `persist_picture` fails,
//! so a failed request leaves neither a row nor an orphan file behind.

use crate::errors::AppError;
use crate::flows::contexts::{PictureCtxData, PictureTarget};
use crate::models::picture::MAX_TITLE_LEN;
use crate::repositories::{NewPicture, PictureChanges};
use std::sync::Arc;
use tracing::{event, info, instrument, warn, Level};
use vitrine::slug::{is_valid_slug, slugify};
use vitrine::{Flow, FlowContext, FlowControl, FlowRegistry, SkipCondition};

pub fn register_picture_flow(registry: &FlowRegistry<AppError>) {
  let is_new: SkipCondition<PictureCtxData> = Arc::new(|ctx: FlowContext<PictureCtxData>| {
    let target = ctx.read().target;
    target == PictureTarget::New
  });
  let no_upload: SkipCondition<PictureCtxData> = Arc::new(|ctx: FlowContext<PictureCtxData>| {
    let missing = ctx.read().source.is_none();
    missing
  });
  let nothing_validated: SkipCondition<PictureCtxData> = Arc::new(|ctx: FlowContext<PictureCtxData>| {
    let missing = ctx.read().validated.is_none();
    missing
  });
  let nothing_replaced: SkipCondition<PictureCtxData> = Arc::new(|ctx: FlowContext<PictureCtxData>| {
    let missing = ctx.read().replaced_image_path.is_none();
    missing
  });

  let mut flow = Flow::<PictureCtxData, AppError>::new(&[
    ("load_existing", false, Some(is_new)),
    ("validate_upload", false, Some(no_upload)),
    ("resolve_metadata", false, None),
    ("store_file", false, Some(nothing_validated)),
    ("persist_picture", false, None),
    ("remove_replaced_file", true, Some(nothing_replaced)),
  ]);

  flow.on("load_existing", load_existing);
  flow.on("validate_upload", validate_upload);
  flow.on("resolve_metadata", resolve_metadata);
  flow.on("store_file", store_file);
  flow.on("persist_picture", persist_picture);
  flow.on("remove_replaced_file", remove_replaced_file);

  registry.register(flow);
  tracing::info!("Picture flow registered.");
}

async fn load_existing(ctx: FlowContext<PictureCtxData>) -> Result<FlowControl, AppError> {
  let (target, repos) = {
    let guard = ctx.read();
    (guard.target, guard.app_state.repos.clone())
  };
  let PictureTarget::Existing(id) = target else {
    return Ok(FlowControl::Continue);
  };
  let existing = repos
    .pictures
    .get(id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Picture with ID {} not found.", id)))?;
  ctx.write().existing = Some(existing);
  Ok(FlowControl::Continue)
}

async fn validate_upload(ctx: FlowContext<PictureCtxData>) -> Result<FlowControl, AppError> {
  let (source, policy) = {
    let mut guard = ctx.write();
    (guard.source.take(), guard.app_state.upload_policy.clone())
  };
  let Some(source) = source else {
    return Ok(FlowControl::Continue);
  };
  let validated = policy.validate(source)?;
  event!(Level::DEBUG, kind = %validated.kind, size = validated.size(), "Upload accepted.");
  ctx.write().validated = Some(validated);
  Ok(FlowControl::Continue)
}

/// Settles the title and slug. A new picture takes its title from the request
/// or, failing that, from the uploaded file's name, and derives its slug from
/// the title unless one is given. An existing picture keeps its slug unless a
/// new one is sent.
async fn resolve_metadata(ctx: FlowContext<PictureCtxData>) -> Result<FlowControl, AppError> {
  let mut guard = ctx.write();

  let requested_title = guard.title.take().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
  let fallback_title = guard
    .validated
    .as_ref()
    .and_then(|v| v.original_name.as_deref())
    .map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
    .map(|stem| stem.chars().take(MAX_TITLE_LEN).collect::<String>())
    .filter(|t| !t.is_empty());

  let title = match (guard.target, requested_title) {
    (_, Some(title)) => Some(title),
    (PictureTarget::New, None) => Some(
      fallback_title.ok_or_else(|| AppError::Validation("A picture title is required.".to_string()))?,
    ),
    (PictureTarget::Existing(_), None) => None,
  };
  if let Some(title) = &title {
    if title.chars().count() > MAX_TITLE_LEN {
      return Err(AppError::Validation(format!(
        "Picture title must be at most {} characters.",
        MAX_TITLE_LEN
      )));
    }
  }

  let requested_slug = guard.slug.take().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
  let slug = match (requested_slug, guard.target, &title) {
    (Some(slug), _, _) => {
      if !is_valid_slug(&slug) {
        return Err(AppError::Validation(format!(
          "Slug '{}' must match ^[a-z0-9-]+$ and be at most 32 characters.",
          slug
        )));
      }
      Some(slug)
    }
    (None, PictureTarget::New, Some(title)) => Some(slugify(title).ok_or_else(|| {
      AppError::Validation(format!("Cannot derive a slug from title '{}'; provide one.", title))
    })?),
    (None, _, _) => None,
  };

  guard.title = title;
  guard.slug = slug;
  Ok(FlowControl::Continue)
}

#[instrument(name = "picture_flow::store_file", skip_all, err(Display))]
async fn store_file(ctx: FlowContext<PictureCtxData>) -> Result<FlowControl, AppError> {
  let (validated, uploads) = {
    let guard = ctx.read();
    (guard.validated.clone(), guard.app_state.uploads.clone())
  };
  let Some(validated) = validated else {
    return Ok(FlowControl::Continue);
  };
  let stored = uploads.save(&validated).await?;
  ctx.write().stored = Some(stored);
  Ok(FlowControl::Continue)
}

#[instrument(name = "picture_flow::persist_picture", skip_all, err(Display))]
async fn persist_picture(ctx: FlowContext<PictureCtxData>) -> Result<FlowControl, AppError> {
  let (target, title, slug, stored, existing, repos, uploads) = {
    let guard = ctx.read();
    (
      guard.target,
      guard.title.clone(),
      guard.slug.clone(),
      guard.stored.clone(),
      guard.existing.clone(),
      guard.app_state.repos.clone(),
      guard.app_state.uploads.clone(),
    )
  };

  let result = match target {
    PictureTarget::New => match (&stored, title, slug) {
      (Some(file), Some(title), Some(slug)) => repos
        .pictures
        .create(NewPicture {
          title,
          slug,
          image_path: file.stored_name.clone(),
          file_path: file.public_url.clone(),
        })
        .await
        .map(Some),
      (None, _, _) => Err(AppError::Upload(vitrine::UploadError::MissingPayload)),
      _ => Err(AppError::Internal("Picture metadata was not resolved.".to_string())),
    },
    PictureTarget::Existing(id) => {
      repos
        .pictures
        .update(
          id,
          PictureChanges {
            title,
            slug,
            file: stored.as_ref().map(|f| (f.stored_name.clone(), f.public_url.clone())),
          },
        )
        .await
    }
  };

  let picture = match result {
    Ok(Some(picture)) => picture,
    failure => {
      if let Some(file) = &stored {
        match uploads.remove(&file.stored_name).await {
          Ok(_) => info!(stored_name = %file.stored_name, "Removed file of failed picture write."),
          Err(e) => warn!(error = %e, stored_name = %file.stored_name, "Could not remove file of failed picture write."),
        }
      }
      return match failure {
        Err(e) => Err(e),
        _ => Err(AppError::NotFound("Picture disappeared during the update.".to_string())),
      };
    }
  };

  let replaced = match (&existing, &stored) {
    (Some(old), Some(_)) if old.image_path != picture.image_path => Some(old.image_path.clone()),
    _ => None,
  };
  info!(picture_id = %picture.id, image_path = %picture.image_path, "Picture persisted.");
  let mut guard = ctx.write();
  guard.picture = Some(picture);
  guard.replaced_image_path = replaced;
  Ok(FlowControl::Continue)
}

/// The row already points at the new file, so a failure here only leaves an
/// unreferenced file and does not fail the request.
async fn remove_replaced_file(ctx: FlowContext<PictureCtxData>) -> Result<FlowControl, AppError> {
  let (replaced, uploads) = {
    let guard = ctx.read();
    (guard.replaced_image_path.clone(), guard.app_state.uploads.clone())
  };
  if let Some(old) = replaced {
    if let Err(e) = uploads.remove(&old).await {
      warn!(error = %e, stored_name = %old, "Could not remove replaced picture file.");
    }
  }
  Ok(FlowControl::Continue)
}
