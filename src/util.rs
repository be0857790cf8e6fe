use time::OffsetDateTime;
use uuid::Uuid;

/// Last component of a client supplied path, split on both `/` and `\`.
pub fn base_name(filename: &str) -> &str {
	filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// Extension of `filename` including the leading dot, or an empty string
/// when the name has no dot at all.
pub fn file_extension(filename: &str) -> String {
	match filename.rsplit_once('.') {
		Some((_, ext)) => format!(".{ext}"),
		None => String::new(),
	}
}

/// Object storage key for a new upload: `u/{user}/uploads/{uuid}-{unix}{ext}`.
///
/// Uniqueness comes from the random uuid, nothing checks for collisions.
pub fn storage_key(user_id: i64, filename: &str, now: OffsetDateTime) -> String {
	format!(
		"u/{}/uploads/{}-{}{}",
		user_id,
		Uuid::new_v4(),
		now.unix_timestamp(),
		file_extension(filename)
	)
}

pub fn public_url(base: &str, key: &str) -> String {
	format!("{}/{}", base.trim_end_matches('/'), key)
}

#[test]
fn test_base_name() {
	assert_eq!(base_name("cat.png"), "cat.png");
	assert_eq!(base_name("photos/2024/cat.png"), "cat.png");
	assert_eq!(base_name("C:\\Users\\alice\\cat.png"), "cat.png");
	assert_eq!(base_name("x./../../999/uploads/evil"), "evil");
	assert_eq!(base_name("dir/"), "");
	assert_eq!(file_extension(base_name("x./../../999/uploads/evil")), "");
}

#[test]
fn test_extension() {
	assert_eq!(file_extension("cat.png"), ".png");
	assert_eq!(file_extension("archive.tar.gz"), ".gz");
	assert_eq!(file_extension("README"), "");
	assert_eq!(file_extension(".bashrc"), ".bashrc");
	assert_eq!(file_extension("trailing."), ".");
}

#[test]
fn test_storage_key() {
	let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();

	let key = storage_key(42, "holiday.jpeg", now);

	assert!(key.starts_with("u/42/uploads/"));
	assert!(key.ends_with("-1700000000.jpeg"));

	// uuid sits between the prefix and the timestamp
	let uuid = &key["u/42/uploads/".len()..key.len() - "-1700000000.jpeg".len()];
	assert!(Uuid::parse_str(uuid).is_ok());

	assert_ne!(key, storage_key(42, "holiday.jpeg", now));
	assert!(storage_key(7, "noext", now).ends_with("-1700000000"));
}

#[test]
fn test_public_url() {
	assert_eq!(
		public_url("https://cdn.example.com", "u/1/uploads/a.png"),
		"https://cdn.example.com/u/1/uploads/a.png"
	);
	assert_eq!(
		public_url("https://cdn.example.com/", "u/1/uploads/a.png"),
		"https://cdn.example.com/u/1/uploads/a.png"
	);
}
