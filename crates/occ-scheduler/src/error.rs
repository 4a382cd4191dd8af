use occ_storage::TxIndex;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build the worker thread pool")]
    ThreadPool(#[source] rayon::ThreadPoolBuildError),
    #[error(
        "transaction {index} read an estimate of transaction {writer} during sequential execution"
    )]
    EstimateDuringSequential { index: TxIndex, writer: TxIndex },
    #[error("transaction {index} was never executed")]
    MissingOutput { index: TxIndex },
}
