// Tables are owned by the account service; names follow its camelCase DDL.

pub const SELECT_USER: &str = r#"
SELECT id, name FROM "Users" WHERE id = $1;
"#;

pub const SELECT_VERIFIED_CONTACTS: &str = r#"
SELECT id,
       "userId" AS user_id,
       name,
       phone,
       relationship,
       "isVerified" AS verified,
       "createdAt" AS created_at
FROM "Contacts"
WHERE "userId" = $1 AND "isVerified" = true
ORDER BY "createdAt" ASC, id ASC;
"#;

pub const MARK_CONTACTS_VERIFIED: &str = r#"
UPDATE "Contacts"
SET "isVerified" = true,
    "updatedAt" = NOW()
WHERE "userId" = $1 AND phone = $2 AND "isVerified" = false;
"#;

pub const INSERT_SOS_EVENT: &str = r#"
INSERT INTO "SOSEvents" (
    id, "userId", type, latitude, longitude, address, "contactsNotified", "contactsData", status, "createdAt", "updatedAt"
) VALUES ($1, $2, CAST($3 AS "enum_SOSEvents_type"), $4, $5, $6, $7, $8, 'active', NOW(), NOW());
"#;

pub const SELECT_SOS_EVENT: &str = r#"
SELECT id,
       "userId" AS user_id,
       type::text AS kind,
       latitude::float8 AS latitude,
       longitude::float8 AS longitude,
       address,
       "contactsNotified" AS contacts_notified,
       "contactsData" AS contacts_data,
       status::text AS status,
       notes,
       "createdAt" AS created_at
FROM "SOSEvents"
WHERE id = $1;
"#;

// Optional filters are bound as NULL.
pub const SELECT_SOS_EVENTS: &str = r#"
SELECT id,
       "userId" AS user_id,
       type::text AS kind,
       latitude::float8 AS latitude,
       longitude::float8 AS longitude,
       address,
       "contactsNotified" AS contacts_notified,
       "contactsData" AS contacts_data,
       status::text AS status,
       notes,
       "createdAt" AS created_at
FROM "SOSEvents"
WHERE ($1::uuid IS NULL OR "userId" = $1)
  AND ($2::timestamptz IS NULL OR "createdAt" >= $2)
  AND ($3::timestamptz IS NULL OR "createdAt" <= $3)
ORDER BY "createdAt" DESC
LIMIT $4;
"#;

pub const UPDATE_SOS_EVENT_STATUS: &str = r#"
UPDATE "SOSEvents"
SET status = CAST($2 AS "enum_SOSEvents_status"),
    notes = COALESCE($3, notes),
    "updatedAt" = NOW()
WHERE id = $1 AND status = 'active';
"#;

pub const COUNT_SOS_EVENTS_SINCE: &str = r#"
SELECT COUNT(*) FROM "SOSEvents" WHERE "createdAt" >= $1;
"#;

pub const SELECT_ACTIVE_USERS_SINCE: &str = r#"
SELECT DISTINCT "userId" FROM "SOSEvents" WHERE "createdAt" >= $1;
"#;
