use aws_lambda_events::event::s3::S3Event;
use percent_encoding::percent_decode_str;

/// One object named by a change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub source_location: String,
    pub object_identifier: String,
}

impl ObjectRef {
    pub fn new(source_location: impl Into<String>, object_identifier: impl Into<String>) -> Self {
        Self {
            source_location: source_location.into(),
            object_identifier: object_identifier.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Object(ObjectRef),
    /// Entry that does not name an object; carries why.
    Malformed(String),
}

/// The ordered records of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeNotification {
    pub records: Vec<Record>,
}

impl ChangeNotification {
    pub fn from_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = ObjectRef>,
    {
        Self {
            records: objects.into_iter().map(Record::Object).collect(),
        }
    }

    /// Object keys in S3 notifications are form-urlencoded, so they are
    /// decoded before use.
    pub fn from_s3_event(event: &S3Event) -> Self {
        let records = event
            .records
            .iter()
            .map(|record| {
                let bucket = match record.s3.bucket.name.as_deref() {
                    Some(name) if !name.is_empty() => name,
                    _ => return Record::Malformed("no bucket name in record".to_string()),
                };
                let key = match record.s3.object.key.as_deref() {
                    Some(key) if !key.is_empty() => key,
                    _ => return Record::Malformed(format!("no object key for bucket {bucket}")),
                };
                match decode_object_key(key) {
                    Some(key) => Record::Object(ObjectRef::new(bucket, key)),
                    None => Record::Malformed(format!(
                        "object key {key:?} is not valid UTF-8 once decoded"
                    )),
                }
            })
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn decode_object_key(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}
