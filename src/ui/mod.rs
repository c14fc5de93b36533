pub mod month_view;
