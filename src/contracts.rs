//! Contract Definitions
//!
//! Solidity interfaces of the ArcadeSwap contracts, defined with alloy's
//! `sol!` macro. Each interface is annotated with `#[sol(rpc)]` so it
//! generates an instance type that can make calls through any alloy Provider.
//!
//! Events and custom errors are declared alongside the functions so logs
//! and revert data decode into named structures.

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

// ── Pair ──────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IArcadeSwapPair {
        error AlreadyInitialized();
        error BalanceOverflow();
        error InsufficientInputAmount();
        error InsufficientLiquidity();
        error InsufficientLiquidityBurned();
        error InsufficientLiquidityMinted();
        error InsufficientOutputAmount();
        error InvalidK();
        error TransferFailed();

        event Burn(address indexed sender, uint256 amount0, uint256 amount1, address to);
        event Mint(address indexed sender, uint256 amount0, uint256 amount1);
        event Sync(uint256 reserve0, uint256 reserve1);
        event Swap(address indexed sender, uint256 amount0Out, uint256 amount1Out, address indexed to);

        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

// ── Router ────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IArcadeSwapRouter {
        error ExcessiveInputAmount();
        error InsufficientAAmount();
        error InsufficientBAmount();
        error InsufficientOutputAmount();
        error SafeTransferFailed();

        function addLiquidity(address tokenA, address tokenB, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to) external returns (uint256[] memory amounts);
    }
}

// ── Library ───────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IArcadeSwapLibrary {
        function getAmountOut(uint256 amountIn, uint256 reserveIn, uint256 reserveOut) external pure returns (uint256);
        function quote(uint256 amountIn, uint256 reserveIn, uint256 reserveOut) external pure returns (uint256 amountOut);
    }
}
