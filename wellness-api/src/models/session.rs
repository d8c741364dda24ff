use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::{
    AsChangeset, Identifiable, Insertable, Queryable, Selectable,
    deserialize::{self, FromSql},
    serialize::{self, Output, ToSql},
    sql_types::Text,
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::schema::sessions;

/// Visibility of a session. Drafts are only readable by their owner.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TS,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Draft,
    Published,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Published => "published",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SessionStatus::Draft),
            "published" => Ok(SessionStatus::Published),
            _ => Err(ValidationError::InvalidStatus),
        }
    }
}

impl ToSql<Text, Sqlite> for SessionStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for SessionStatus {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        s.parse()
            .map_err(|_| format!("Invalid SessionStatus value: {}", s).into())
    }
}

/// Ordered tag list, stored as a JSON array in a text column.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TS,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[ts(export)]
pub struct Tags(pub Vec<String>);

impl Tags {
    /// Trims every tag and drops the blank ones, keeping the original order.
    pub fn normalized<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Tags(
            raw.into_iter()
                .map(|tag| tag.as_ref().trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl ToSql<Text, Sqlite> for Tags {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        let encoded = serde_json::to_string(&self.0)?;
        out.set_value(encoded);
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Tags {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        let tags: Vec<String> = serde_json::from_str(&s)?;
        Ok(Tags(tags))
    }
}

/// A user-owned content record pointing at externally hosted JSON.
#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    TS,
)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Session {
    pub id: i32,
    pub title: String,
    pub tags: Tags,
    pub json_url: String,
    pub status: SessionStatus,
    /// Owner id; set once at creation.
    #[serde(rename = "user")]
    pub user_id: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

impl Session {
    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.user_id == user_id
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub title: String,
    pub tags: Tags,
    pub json_url: String,
    pub status: SessionStatus,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Column updates for a partial edit. `None` leaves the column alone and
/// there is deliberately no owner column.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = sessions)]
pub struct SessionChangeset {
    pub title: Option<String>,
    pub tags: Option<Tags>,
    pub json_url: Option<String>,
    pub status: Option<SessionStatus>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Tags as the client sends them: a list, or one comma-separated string.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    pub fn normalize(self) -> Tags {
        match self {
            TagsInput::List(list) => Tags::normalized(list),
            TagsInput::Csv(csv) => Tags::normalized(csv.split(',')),
        }
    }
}

/// Body of `POST /api/session`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionInput {
    pub title: Option<String>,
    pub tags: Option<TagsInput>,
    pub json_url: Option<String>,
    pub status: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SessionInput {
    /// Validates the body and builds the row to insert for `owner_id`.
    pub fn into_new_session(
        self,
        owner_id: i32,
        now: NaiveDateTime,
    ) -> Result<NewSession, ValidationError> {
        let title = non_blank(self.title);
        let tags = self.tags.map(TagsInput::normalize).filter(|t| !t.is_empty());
        let json_url = non_blank(self.json_url);

        let (Some(title), Some(tags), Some(json_url)) = (title, tags, json_url) else {
            return Err(ValidationError::MissingSessionFields);
        };

        let status = match self.status {
            Some(raw) => raw.parse()?,
            None => return Err(ValidationError::InvalidStatus),
        };

        Ok(NewSession {
            title,
            tags,
            json_url,
            status,
            user_id: owner_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of `PUT /api/session/<id>`; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub tags: Option<TagsInput>,
    pub json_url: Option<String>,
    pub status: Option<String>,
}

impl SessionUpdate {
    /// Validates the provided fields and turns them into a changeset that
    /// also refreshes `updated_at`.
    pub fn into_changeset(self, now: NaiveDateTime) -> Result<SessionChangeset, ValidationError> {
        if self.title.is_none()
            && self.tags.is_none()
            && self.json_url.is_none()
            && self.status.is_none()
        {
            return Err(ValidationError::EmptyUpdate);
        }

        let title = match self.title {
            Some(raw) => Some(non_blank(Some(raw)).ok_or(ValidationError::BlankField("title"))?),
            None => None,
        };
        let tags = match self.tags {
            Some(raw) => {
                let tags = raw.normalize();
                if tags.is_empty() {
                    return Err(ValidationError::BlankField("tags"));
                }
                Some(tags)
            }
            None => None,
        };
        let json_url = match self.json_url {
            Some(raw) => Some(non_blank(Some(raw)).ok_or(ValidationError::BlankField("jsonUrl"))?),
            None => None,
        };
        let status = match self.status {
            Some(raw) => Some(raw.parse::<SessionStatus>()?),
            None => None,
        };

        Ok(SessionChangeset {
            title,
            tags,
            json_url,
            status,
            updated_at: Some(now),
        })
    }
}

/// Owner annotation on the public read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionOwner {
    pub id: i32,
    pub email: String,
}

/// A session with its owner's email filled in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionWithOwner {
    pub id: i32,
    pub title: String,
    pub tags: Tags,
    pub json_url: String,
    pub status: SessionStatus,
    pub user: SessionOwner,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

impl From<(Session, String)> for SessionWithOwner {
    fn from((session, owner_email): (Session, String)) -> Self {
        SessionWithOwner {
            id: session.id,
            title: session.title,
            tags: session.tags,
            json_url: session.json_url,
            status: session.status,
            user: SessionOwner {
                id: session.user_id,
                email: owner_email,
            },
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}
