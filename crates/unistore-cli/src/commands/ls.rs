use anyhow::Result;
use std::path::Path;

use unistore_core::service::StorageService;
use unistore_core::types::{ListRequest, Object};

use super::{format_bytes, open_service};

pub struct LsOptions {
    pub prefix: String,
    pub size: usize,
    pub cursor: String,
    pub all: bool,
    pub json: bool,
}

pub async fn run(base_dir: &Path, bucket: &str, opts: LsOptions) -> Result<()> {
    let service = open_service(base_dir).await?;
    let mut printer = |obj: &Object| -> Result<()> {
        if opts.json {
            println!("{}", serde_json::to_string(obj)?);
        } else {
            println!("{}", format_entry(obj));
        }
        Ok(())
    };

    let next = list_pages(service.as_ref(), bucket, &opts, &mut printer).await?;
    if !next.is_empty() {
        eprintln!("more results: --cursor {next}");
    }
    Ok(())
}

/// Walk the listing, handing each entry to `emit`. Returns the cursor to
/// resume from, empty once the listing is exhausted.
async fn list_pages(
    service: &dyn StorageService,
    bucket: &str,
    opts: &LsOptions,
    emit: &mut dyn FnMut(&Object) -> Result<()>,
) -> Result<String> {
    let mut cursor = opts.cursor.clone();
    loop {
        let page = service
            .list(ListRequest {
                bucket: bucket.to_string(),
                prefix: opts.prefix.clone(),
                size: opts.size,
                cursor,
            })
            .await?;
        for obj in &page.objects {
            emit(obj)?;
        }
        if !opts.all || page.cursor.is_empty() {
            return Ok(page.cursor);
        }
        cursor = page.cursor;
    }
}

fn format_entry(obj: &Object) -> String {
    if obj.directory {
        format!("{:>10}  {:<24}  {}", "DIR", "", obj.name)
    } else {
        format!(
            "{:>10}  {:<24}  {}",
            format_bytes(obj.size),
            obj.updated,
            obj.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use unistore_core::types::PutRequest;
    use unistore_storage::local::LocalStorage;

    fn opts(size: usize, all: bool) -> LsOptions {
        LsOptions {
            prefix: String::new(),
            size,
            cursor: String::new(),
            all,
            json: false,
        }
    }

    async fn seeded() -> (TempDir, LocalStorage) {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "ls-test").unwrap();
        for key in ["a.txt", "b.txt", "c/d.txt", "e.txt"] {
            storage
                .put(PutRequest::new("bkt", key, Cursor::new(b"12345".to_vec())))
                .await
                .unwrap();
        }
        (tmp, storage)
    }

    #[tokio::test]
    async fn all_follows_every_page() {
        let (_tmp, storage) = seeded().await;
        let mut names = Vec::new();
        let next = list_pages(&storage, "bkt", &opts(1, true), &mut |o: &Object| {
            names.push(o.name.clone());
            Ok(())
        })
        .await
        .unwrap();

        assert!(next.is_empty());
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt", "c/", "e.txt"]);
    }

    #[tokio::test]
    async fn single_page_returns_resume_cursor() {
        let (_tmp, storage) = seeded().await;
        let mut count = 0;
        let next = list_pages(&storage, "bkt", &opts(2, false), &mut |_: &Object| {
            count += 1;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(next, "b.txt");
    }

    #[test]
    fn directories_render_without_size() {
        let dir = Object::directory("bkt", "photos/");
        assert!(format_entry(&dir).contains("DIR"));
        assert!(format_entry(&dir).ends_with("photos/"));
    }
}
