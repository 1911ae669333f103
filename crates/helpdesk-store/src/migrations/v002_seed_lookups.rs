use rusqlite::Connection;

const UP_SQL: &str = r#"
INSERT OR IGNORE INTO statuses (id, name, description) VALUES
    (1, 'Pending',     'Awaiting assignment or claim'),
    (2, 'In-Progress', 'Assigned and being worked'),
    (3, 'Resolved',    'Closed with a resolution'),
    (4, 'Cancelled',   'Closed without a resolution');

INSERT OR IGNORE INTO priorities (id, name, description) VALUES
    (1, 'High',   'Customer blocked'),
    (2, 'Medium', 'Degraded experience'),
    (3, 'Low',    'Question or minor issue');

INSERT OR IGNORE INTO categories (name, description) VALUES
    ('General',   'Anything that fits nowhere else'),
    ('Technical', 'Product faults and errors'),
    ('Billing',   'Invoices, payments and refunds'),
    ('Account',   'Access, profile and settings');
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
