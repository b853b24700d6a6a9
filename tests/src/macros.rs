#[macro_export]
macro_rules! tests {
    (
        $(
            $( #[$attrs:meta] )*
            $f:ident
        ),+
    ) => {
        #[cfg(feature = "sqlite")]
        mod sqlite {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    $crate::DbTest::run(
                        Box::new($crate::db::sqlite::SetupSqlite),
                        move |test| Box::pin(async move {
                            super::$f(test).await;
                        }),
                    );
                }
            )*
        }

        #[cfg(feature = "postgresql")]
        mod postgresql {
            $(
                #[test]
                $( #[$attrs] )*
                fn $f() {
                    $crate::DbTest::run(
                        Box::new($crate::db::postgresql::SetupPostgreSQL::new()),
                        move |test| Box::pin(async move {
                            super::$f(test).await;
                        }),
                    );
                }
            )*
        }
    };
    (
        $(
            $( #[$attrs:meta] )*
            $f:ident,
        )+
    ) => {
        $crate::tests!( $(
            $( #[$attrs] )*
            $f
        ),+ );
    }
}
