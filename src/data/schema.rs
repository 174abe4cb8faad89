/// DDL for the three catalogue tables.

pub const CREATE_SPORTS: &str = "
CREATE TABLE IF NOT EXISTS sports (
    name   TEXT PRIMARY KEY NOT NULL,
    slug   TEXT,
    active INTEGER NOT NULL
);
";

pub const CREATE_EVENTS: &str = "
CREATE TABLE IF NOT EXISTS events (
    name            TEXT PRIMARY KEY NOT NULL,
    slug            TEXT,
    active          INTEGER NOT NULL,
    type            INTEGER NOT NULL DEFAULT 0,
    status          INTEGER NOT NULL DEFAULT 0,
    scheduled_start TEXT,
    actual_start    TEXT,
    sport           TEXT NOT NULL,
    FOREIGN KEY (sport) REFERENCES sports(name)
);
";

pub const CREATE_SELECTIONS: &str = "
CREATE TABLE IF NOT EXISTS selections (
    name    TEXT PRIMARY KEY NOT NULL,
    active  INTEGER NOT NULL,
    price   TEXT NOT NULL DEFAULT '0.00',
    outcome INTEGER NOT NULL DEFAULT 0,
    event   TEXT NOT NULL,
    FOREIGN KEY (event) REFERENCES events(name)
);
";

pub const CREATE_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS idx_events_sport ON events(sport);
CREATE INDEX IF NOT EXISTS idx_selections_event ON selections(event);
";

/// Stamps `actual_start` on every status change; a move to STARTED also
/// flips the event in-play.
pub const CREATE_TRIGGERS: &str = "
CREATE TRIGGER IF NOT EXISTS trg_events_status
AFTER UPDATE OF status ON events
FOR EACH ROW
WHEN NEW.status IS NOT OLD.status
BEGIN
    UPDATE events
    SET actual_start = strftime('%Y-%m-%dT%H:%M:%S+00:00', 'now'),
        type = CASE WHEN NEW.status = 1 THEN 1 ELSE NEW.type END
    WHERE name = NEW.name;
END;
";

pub const DROP_ALL: &str = "
DROP TRIGGER IF EXISTS trg_events_status;
DROP TABLE IF EXISTS selections;
DROP TABLE IF EXISTS events;
DROP TABLE IF EXISTS sports;
";

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Cross-tier projection the search predicates are appended to.
///
/// Free-text expressions may refer to the aliases `t` (sports), `t1`
/// (events) and `t2` (selections).
pub const SEARCH_BASE: &str = "SELECT t.name AS sport, t1.name AS event, t2.name AS selection \
FROM sports t \
JOIN events t1 ON t1.sport = t.name \
JOIN selections t2 ON t2.event = t1.name";

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub const SEED_SPORT: (&str, &str) = ("Football", "football");
pub const SEED_EVENT: (&str, &str) = ("World Cup 2022", "world-cup");
pub const SEED_SELECTION: (&str, &str) = ("Norway Win", "10.00");
