use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250210_000003_create_suppliers_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Suppliers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Suppliers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Suppliers::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Suppliers::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Suppliers::Phone).string_len(64).null())
                    .col(ColumnDef::new(Suppliers::Address).string_len(1024).null())
                    .col(
                        ColumnDef::new(Suppliers::ContactPerson)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Suppliers::Status)
                            .string_len(32)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Suppliers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Suppliers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Suppliers {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Address,
    ContactPerson,
    Status,
    CreatedAt,
    UpdatedAt,
}
